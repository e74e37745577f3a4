//! Integration Test: Layering
//!
//! **Policy**: the workflow core is headless and transport-agnostic.
//! - Only `studio/core/src/client/` may name `reqwest`
//! - `studio-core` must not depend on surface crates (clap, anyhow,
//!   tracing-subscriber)
//! - The core never prints; surfaces decide what reaches the terminal

use std::fs;

use architectural_enforcement::{assert_clean, production_sources, workspace_root};

#[test]
fn test_reqwest_stays_in_client_module() {
    let mut violations = Vec::new();

    for file in production_sources("studio") {
        if file.path.starts_with("studio/core/src/client") {
            continue;
        }
        for (line, code) in file.code_lines() {
            if code.contains("reqwest") {
                violations.push(file.violation(line, code));
            }
        }
    }

    assert_clean("reqwest used outside studio/core/src/client", &violations);
}

#[test]
fn test_core_has_no_surface_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("studio/core/Cargo.toml"))
        .expect("studio/core/Cargo.toml should exist");
    let declares = |dep: &str| {
        manifest.lines().map(str::trim).any(|line| {
            line.split('=')
                .next()
                .is_some_and(|key| key.trim() == dep)
        })
    };

    let violations: Vec<String> = ["clap", "anyhow", "tracing-subscriber"]
        .into_iter()
        .filter(|dep| declares(dep))
        .map(|dep| format!("studio/core/Cargo.toml - depends on {dep}"))
        .collect();

    assert_clean("surface crates in studio-core", &violations);
}

#[test]
fn test_core_does_not_print() {
    let mut violations = Vec::new();

    for file in production_sources("studio/core/src") {
        for (line, code) in file.code_lines() {
            if code.contains("println!") || code.contains("eprintln!") {
                violations.push(file.violation(line, code));
            }
        }
    }

    assert_clean("printing from studio-core (use tracing)", &violations);
}

#[test]
fn test_sources_are_found() {
    assert!(!production_sources("studio/core/src").is_empty());
    assert!(!production_sources("studio/cli/src").is_empty());
}
