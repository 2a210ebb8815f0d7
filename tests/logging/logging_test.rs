//! Tests for `src/logging.rs`.

use wxbridge::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // Only one global subscriber can be installed per process, so the
    // result is not asserted. The directory is created either way.
    let _result = wxbridge::logging::init_production(&logs_dir);
    assert!(logs_dir.exists(), "logs directory should be created");
}
