//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods.
//! **Exceptions**: Frame pacing in the animation tick loop, periodic tasks
//! driven by `tokio::time::interval`, test code.

use architectural_enforcement::{code_part, context_mentions, scan};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(|_, lines, idx| {
        let code = code_part(lines[idx]);
        if !(code.contains("::sleep(") || code.contains(".sleep(")) {
            return None;
        }
        if is_frame_pacing(lines, idx) || is_interval_pattern(lines, idx) {
            return None;
        }
        Some("sleep".to_string())
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE sleep uses:");
        eprintln!("  - Frame pacing in the animation tick loop (sleep(frame_delay) inside select!)");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("  - Test code");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Sleep that paces animation frames and can be cut short by a stop signal
fn is_frame_pacing(lines: &[&str], idx: usize) -> bool {
    context_mentions(lines, idx, 10, 2, &["frame", "tick"])
        && context_mentions(lines, idx, 10, 2, &["select!"])
}

fn is_interval_pattern(lines: &[&str], idx: usize) -> bool {
    context_mentions(lines, idx, 20, 5, &["interval.tick()", "time::interval"])
}

#[test]
fn test_frame_pacing_detection() {
    let code = [
        "async fn tick_loop(stop: Arc<Notify>) {",
        "    loop {",
        "        let frame_delay = engine.interval();",
        "        tokio::select! {",
        "            () = stop.notified() => break,",
        "            () = tokio::time::sleep(frame_delay) => {}",
        "        }",
        "    }",
        "}",
    ];
    assert!(is_frame_pacing(&code, 5));
}

#[test]
fn test_plain_sleep_is_not_frame_pacing() {
    let code = [
        "async fn wait_for_file(path: &Path) {",
        "    while !path.exists() {",
        "        tokio::time::sleep(Duration::from_millis(100)).await;",
        "    }",
        "}",
    ];
    assert!(!is_frame_pacing(&code, 2));
    assert!(!is_interval_pattern(&code, 2));
}
