#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! API Contract Tests
//!
//! Routes registered in src/main.rs must match tests/fixtures/api_routes.txt.
//! Update the golden file only for intentional API changes.
//!
//! Run with: cargo test --test api_contract

use std::collections::BTreeSet;
use std::fs;

const GOLDEN: &str = "tests/fixtures/api_routes.txt";

fn golden_lines() -> Vec<String> {
    let content = fs::read_to_string(GOLDEN).expect("Failed to read api_routes.txt");
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `.route("/path", method(handler))` lines out of main.rs
fn extract_routes_from_source() -> BTreeSet<String> {
    let content = fs::read_to_string("src/main.rs").expect("Failed to read main.rs");

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("//"))
        .filter_map(|line| {
            let start = line.find(".route(\"")?;
            let rest = &line[start + 8..];
            let path = &rest[..rest.find('"')?];
            let method = ["get", "post", "put", "delete"]
                .into_iter()
                .find(|m| rest.contains(&format!("{}(", m)))?;
            Some(format!("{} {}", method.to_uppercase(), path))
        })
        .collect()
}

#[test]
fn api_routes_match_contract() {
    let golden: BTreeSet<String> = golden_lines().into_iter().collect();
    let actual = extract_routes_from_source();

    let added: Vec<_> = actual.difference(&golden).collect();
    let removed: Vec<_> = golden.difference(&actual).collect();

    if !added.is_empty() || !removed.is_empty() {
        let mut msg = String::from("\n\nAPI CONTRACT VIOLATION!\n\n");
        for route in &added {
            msg.push_str(&format!("  + {} (not in contract)\n", route));
        }
        for route in &removed {
            msg.push_str(&format!("  - {} (missing from main.rs)\n", route));
        }
        msg.push_str("\nIf intentional, update tests/fixtures/api_routes.txt\n");
        panic!("{}", msg);
    }
}

#[test]
fn golden_file_is_sorted() {
    let routes = golden_lines();
    let mut sorted = routes.clone();
    sorted.sort();
    assert_eq!(
        routes, sorted,
        "api_routes.txt is not sorted! Please sort alphabetically."
    );
}
