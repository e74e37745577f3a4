//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The HTTP transport stays behind the client module
//! - No sleeping or panicking shortcuts in production code
//! - The core crate carries no surface dependencies
//!
//! The helpers here walk the workspace sources with `walkdir` and hand the
//! tests only production lines (everything before a file's `#[cfg(test)]`).

use std::fs;
use std::path::{Path, PathBuf};

/// A production source file
#[derive(Debug)]
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`, numbered from 1
    pub lines: Vec<(usize, String)>,
}

impl SourceFile {
    /// Production lines with comments stripped, skipping blank results
    pub fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().filter_map(|(number, line)| {
            let code = line.split("//").next().unwrap_or(line).trim();
            (!code.is_empty()).then_some((*number, code))
        })
    }

    /// Format a violation at a line
    pub fn violation(&self, line: usize, what: &str) -> String {
        format!("{}:{line} - {what}", self.path.display())
    }
}

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
pub fn production_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root();
    let base = root.join(dir);
    if !base.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(&base)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            let lines = content
                .lines()
                .enumerate()
                .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
                .map(|(idx, line)| (idx + 1, line.to_string()))
                .collect();
            let path = e.path().strip_prefix(&root).unwrap_or(e.path()).to_path_buf();
            Some(SourceFile { path, lines })
        })
        .collect()
}

/// Report violations and panic if there are any
pub fn assert_clean(rule: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {rule}\nFix these before merging!",
        violations.len()
    );
}
