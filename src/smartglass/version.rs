//! Bridge server version check.
//!
//! The bridge is a Python package and reports PEP 440 versions (`1.2.0`,
//! `1.2.0rc1`, `1.2.0.dev3`, `1.2.0.post1`). They are mapped onto
//! [`semver::Version`] so that ordering follows PEP 440:
//! dev < alpha < beta < rc < release < post.

use semver::{BuildMetadata, Prerelease, Version};

/// Oldest `xbox-smartglass-core` release the bridge may run.
pub const MIN_REQUIRED_SERVER_VERSION: &str = "1.1.2";

/// Pre-release phase spellings and their rank. Rank 0 is reserved for a
/// dev build of the final release. Longer spellings come first so `a`
/// does not swallow `alpha`.
const PHASES: [(&str, u64); 8] = [
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("preview", 3),
    ("pre", 3),
    ("rc", 3),
    ("c", 3),
];

const SEPARATORS: [char; 3] = ['.', '-', '_'];

/// A reported server version.
///
/// Release components past the third and local labels (`+ubuntu1`) are
/// ignored. Trailing zero components are insignificant (`1.1` == `1.1.0`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion(Version);

impl ServerVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        let raw = raw.strip_prefix('v').unwrap_or(&raw);
        let raw = raw.split('+').next().unwrap_or_default();

        let (release, mut rest) = take_release(raw)?;

        let mut phase = None;
        if let Some((rank, n, tail)) = take_phase(rest) {
            phase = Some((rank, n));
            rest = tail;
        }
        let mut post = None;
        if let Some((n, tail)) = take_tag(rest, &["post", "rev", "r"]) {
            post = Some(n);
            rest = tail;
        }
        let mut dev = None;
        if let Some((n, tail)) = take_tag(rest, &["dev"]) {
            dev = Some(n);
            rest = tail;
        }
        if !rest.is_empty() {
            return None;
        }
        // A dev build of a post-release still sorts after the release
        if post.is_some() && phase.is_none() {
            dev = None;
        }

        let component = |i: usize| release.get(i).copied().unwrap_or(0);
        let mut version = Version::new(component(0), component(1), component(2));
        version.pre = prerelease(phase, dev)?;
        if let Some(n) = post {
            version.build = BuildMetadata::new(&format!("post.{}", n)).ok()?;
        }
        Some(Self(version))
    }
}

/// Leading dot-separated numeric components.
fn take_release(raw: &str) -> Option<(Vec<u64>, &str)> {
    let mut release = Vec::new();
    let mut rest = raw;
    loop {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            break;
        }
        release.push(rest[..end].parse().ok()?);
        rest = &rest[end..];
        match rest.strip_prefix('.') {
            Some(tail) if tail.starts_with(|c: char| c.is_ascii_digit()) => rest = tail,
            _ => break,
        }
    }
    (!release.is_empty()).then_some((release, rest))
}

/// `[sep]name[sep][number]`; a missing number counts as 0.
fn take_tag<'a>(rest: &'a str, names: &[&str]) -> Option<(u64, &'a str)> {
    let rest = rest.trim_start_matches(SEPARATORS);
    let name = names.iter().find(|name| rest.starts_with(**name))?;
    let rest = rest[name.len()..].trim_start_matches(SEPARATORS);
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let n = if end == 0 { 0 } else { rest[..end].parse().ok()? };
    Some((n, &rest[end..]))
}

fn take_phase(rest: &str) -> Option<(u64, u64, &str)> {
    PHASES
        .iter()
        .find_map(|(name, rank)| take_tag(rest, &[*name]).map(|(n, tail)| (*rank, n, tail)))
}

/// Encode phase and dev number as four numeric identifiers
/// (`rank.n.final.dev`) so semver's numeric ordering matches PEP 440.
fn prerelease(phase: Option<(u64, u64)>, dev: Option<u64>) -> Option<Prerelease> {
    let ids = match (phase, dev) {
        (None, None) => return Some(Prerelease::EMPTY),
        (Some((rank, n)), None) => format!("{}.{}.1.0", rank, n),
        (Some((rank, n)), Some(d)) => format!("{}.{}.0.{}", rank, n, d),
        (None, Some(d)) => format!("0.0.0.{}", d),
    };
    Prerelease::new(&ids).ok()
}

/// Whether a reported core version satisfies the minimum. Unparseable
/// versions are rejected.
pub fn is_supported(reported: &str) -> bool {
    let Some(minimum) = ServerVersion::parse(MIN_REQUIRED_SERVER_VERSION) else {
        return false;
    };
    ServerVersion::parse(reported).is_some_and(|v| v >= minimum)
}
