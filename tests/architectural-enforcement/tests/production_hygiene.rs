//! Integration Test: Production Hygiene
//!
//! **Policy**: production code propagates errors and never waits on a timer.
//! - No `.unwrap()` / `.expect(` outside test modules
//! - No `thread::sleep` or `time::sleep`; progress is event-driven through the
//!   store's change feed

use architectural_enforcement::{assert_clean, production_sources};

const SOURCE_DIRS: [&str; 2] = ["studio/core/src", "studio/cli/src"];

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();

    for dir in SOURCE_DIRS {
        for file in production_sources(dir) {
            for (line, code) in file.code_lines() {
                if code.contains(".unwrap()") || code.contains(".expect(") {
                    violations.push(file.violation(line, code));
                }
            }
        }
    }

    assert_clean("unwrap/expect in production code", &violations);
}

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for dir in SOURCE_DIRS {
        for file in production_sources(dir) {
            for (line, code) in file.code_lines() {
                if code.contains("thread::sleep") || code.contains("time::sleep") {
                    violations.push(file.violation(line, code));
                }
            }
        }
    }

    assert_clean("sleep in production code", &violations);
}
