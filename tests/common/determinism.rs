//! Deterministic test environment setup

use chrono::{NaiveDate, NaiveDateTime};

/// Fixed report timestamp (2024-01-01 00:00:00)
pub const TEST_TIMESTAMP: &str = "2024-01-01 00:00:00";

/// Clock for `StackTraceLogger::with_clock`
pub fn test_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("Invalid test timestamp")
}

/// Route `tracing` output through the test harness.
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=hooktrace=debug`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
