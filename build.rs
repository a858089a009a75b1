//! Build script to inject the release version and git SHA.
//!
//! - SGB_VERSION: version string (defaults to CARGO_PKG_VERSION)
//! - SGB_GIT_SHA: commit SHA (falls back to GITHUB_SHA, then git rev-parse)

use std::process::Command;

fn main() {
    let version = std::env::var("SGB_VERSION").unwrap_or_else(|_| {
        std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".into())
    });
    println!("cargo:rustc-env=SGB_VERSION={}", version);

    let git_sha = std::env::var("SGB_GIT_SHA")
        .ok()
        .or_else(|| {
            std::env::var("GITHUB_SHA")
                .ok()
                .map(|s| s.get(..7).unwrap_or(&s).to_string())
        })
        .unwrap_or_else(git_rev_parse);
    println!("cargo:rustc-env=SGB_GIT_SHA={}", git_sha);

    println!("cargo:rerun-if-env-changed=SGB_VERSION");
    println!("cargo:rerun-if-env-changed=SGB_GIT_SHA");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
}

fn git_rev_parse() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".into())
}
