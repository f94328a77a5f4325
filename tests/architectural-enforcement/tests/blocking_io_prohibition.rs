//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: `async fn` bodies MUST NOT perform blocking I/O.
//! **Required**: Move file, registry and subprocess work behind
//! `tokio::task::spawn_blocking`, or keep it in plain functions that are only
//! called from blocking contexts.

use architectural_enforcement::{code_part, enclosing_fn, scan, FnKind};

const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::thread::sleep", "Blocking sleep"),
];

/// Test that async functions do not call blocking I/O directly
#[test]
fn test_no_blocking_io_in_async_functions() {
    let violations = scan(|_, lines, idx| {
        let code = code_part(lines[idx]);
        let (_, label) = BLOCKING_CALLS
            .iter()
            .find(|(needle, _)| code.contains(needle))?;
        if enclosing_fn(lines, idx) != Some(FnKind::Async) {
            return None;
        }
        if is_inside_spawn_blocking(lines, idx) {
            return None;
        }
        Some((*label).to_string())
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O inside async functions!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE blocking I/O:");
        eprintln!("  - Plain (non-async) functions");
        eprintln!("  - Closures passed to tokio::task::spawn_blocking");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} blocking I/O violation(s) in async code.\nFix these before merging!",
            violations.len()
        );
    }
}

fn is_inside_spawn_blocking(lines: &[&str], idx: usize) -> bool {
    let start = idx.saturating_sub(5);
    lines[start..=idx]
        .iter()
        .any(|line| line.contains("spawn_blocking("))
}

#[test]
fn test_blocking_io_detection() {
    let code = [
        "impl Store {",
        "    pub async fn load(&self) -> String {",
        "        std::fs::read_to_string(&self.path).unwrap_or_default()",
        "    }",
        "}",
    ];
    assert_eq!(enclosing_fn(&code, 2), Some(FnKind::Async));
    assert!(!is_inside_spawn_blocking(&code, 2));
}

#[test]
fn test_spawn_blocking_is_accepted() {
    let code = [
        "pub async fn persist(&self) {",
        "    let path = self.path.clone();",
        "    let result = tokio::task::spawn_blocking(move || {",
        "        std::fs::write(path, b\"x\")",
        "    })",
        "    .await;",
        "}",
    ];
    assert!(is_inside_spawn_blocking(&code, 3));
}

#[test]
fn test_sync_helper_is_accepted() {
    let code = [
        "fn save(path: &Path) -> io::Result<()> {",
        "    std::fs::write(path, b\"x\")",
        "}",
    ];
    assert_eq!(enclosing_fn(&code, 1), Some(FnKind::Sync));
}
