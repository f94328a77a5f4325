//! Architectural Enforcement Integration Tests
//!
//! Source scanners shared by the tests in `tests/`:
//! - No sleep() calls outside frame pacing
//! - No blocking I/O inside async functions
//!
//! The scan is line based. It is not a parser; it only has to be good enough
//! for the way this workspace formats its code (rustfmt defaults).

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees checked by the enforcement tests
pub const SOURCE_ROOTS: &[&str] = &[
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../runcat/core/src"),
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../runcat/agent/src"),
];

/// Kind of function enclosing a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnKind {
    /// `async fn`
    Async,
    /// plain `fn`
    Sync,
}

/// One finding, printable as `path:line - text`
#[derive(Debug, Clone)]
pub struct Violation {
    pub path: PathBuf,
    pub line: usize,
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// All `.rs` files under `dir`, sorted
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Run `check` over the production lines of every scanned file
///
/// `check` receives the production lines of a file and the index of the line
/// under test, and returns a label when the line is a violation.
pub fn scan<F>(check: F) -> Vec<Violation>
where
    F: Fn(&Path, &[&str], usize) -> Option<String>,
{
    let mut violations = Vec::new();
    for root in SOURCE_ROOTS {
        let root = Path::new(root);
        if !root.exists() {
            continue;
        }
        for path in rust_files(root) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let lines = production_lines(&content);
            for idx in 0..lines.len() {
                if let Some(label) = check(&path, &lines, idx) {
                    violations.push(Violation {
                        path: path.clone(),
                        line: idx + 1,
                        text: format!("{label}: {}", lines[idx].trim()),
                    });
                }
            }
        }
    }
    violations
}

/// Lines up to the `#[cfg(test)]` module that closes a file
pub fn production_lines(content: &str) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let end = lines
        .windows(2)
        .position(|pair| pair[0].trim() == "#[cfg(test)]" && pair[1].trim_start().starts_with("mod "))
        .unwrap_or(lines.len());
    lines[..end].to_vec()
}

/// Line with any trailing `//` comment removed
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Classify a function header line, if it is one
pub fn fn_header(line: &str) -> Option<FnKind> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest);
    }
    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

/// Nearest function header above `idx` that is indented less than the line
pub fn enclosing_fn(lines: &[&str], idx: usize) -> Option<FnKind> {
    let depth = indent_of(lines[idx]);
    lines[..idx]
        .iter()
        .rev()
        .filter(|line| !line.trim().is_empty() && indent_of(line) < depth)
        .find_map(|line| fn_header(line))
}

/// True when any line within `before`/`after` of `idx` contains one of `needles`
pub fn context_mentions(
    lines: &[&str],
    idx: usize,
    before: usize,
    after: usize,
    needles: &[&str],
) -> bool {
    let start = idx.saturating_sub(before);
    let end = (idx + after + 1).min(lines.len());
    lines[start..end].iter().any(|line| {
        let lower = line.to_lowercase();
        needles.iter().any(|needle| lower.contains(needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_header() {
        assert_eq!(fn_header("    pub async fn start(&self) {"), Some(FnKind::Async));
        assert_eq!(fn_header("pub(crate) fn advance(&mut self) {"), Some(FnKind::Sync));
        assert_eq!(fn_header("fn main() {"), Some(FnKind::Sync));
        assert_eq!(fn_header("    /// fn in a comment"), None);
        assert_eq!(fn_header("    let f = |x| x;"), None);
    }

    #[test]
    fn test_enclosing_fn_uses_indentation() {
        let code = [
            "impl Engine {",
            "    pub async fn start(&self) {",
            "        work().await;",
            "    }",
            "",
            "    fn save(&self) {",
            "        std::fs::write(path, data)?;",
            "    }",
            "}",
        ];
        assert_eq!(enclosing_fn(&code, 2), Some(FnKind::Async));
        assert_eq!(enclosing_fn(&code, 6), Some(FnKind::Sync));
        assert_eq!(enclosing_fn(&code, 0), None);
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n\n#[cfg(test)]\nmod tests {\n    fn b() {}\n}\n";
        assert_eq!(production_lines(content), vec!["fn a() {}", ""]);
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = 1; // std::fs::read"), "let x = 1; ");
    }
}
