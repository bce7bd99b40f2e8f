//! Domain-specific assertion macros for lpr-monitor harnesses.
//!
//! These add context to failures so it is clear which part of the
//! correlation state was wrong.

// ---------------------------------------------------------------------------
// Snapshot assertions
// ---------------------------------------------------------------------------

/// Assert the published snapshot shows `plate`.
///
/// ```rust
/// assert_snapshot_plate!(state, "PBX1234");
/// ```
#[macro_export]
macro_rules! assert_snapshot_plate {
    ($state:expr, $plate:expr) => {{
        let snap = $state.snapshot();
        let expected: &str = $plate;
        match snap.plate.as_deref() {
            Some(actual) if actual == expected => {}
            other => panic!(
                "assert_snapshot_plate! failed:\n  expected: {:?}\n  actual:   {:?}\n  snapshot: {:?}",
                expected, other, snap
            ),
        }
    }};
}

/// Assert the published outcome has the given label
/// (`found`, `not_found`, `lookup_failed`).
#[macro_export]
macro_rules! assert_outcome_label {
    ($state:expr, $label:expr) => {{
        let snap = $state.snapshot();
        let expected: &str = $label;
        match snap.outcome.as_ref().map(|o| o.label()) {
            Some(actual) if actual == expected => {}
            other => panic!(
                "assert_outcome_label! failed:\n  expected: {:?}\n  actual:   {:?}\n  snapshot: {:?}",
                expected, other, snap
            ),
        }
    }};
}

// ---------------------------------------------------------------------------
// Timing helpers
// ---------------------------------------------------------------------------

/// Poll `cond` every 10 ms until it holds or `timeout_ms` elapses.
pub async fn eventually<F: FnMut() -> bool>(timeout_ms: u64, mut cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
