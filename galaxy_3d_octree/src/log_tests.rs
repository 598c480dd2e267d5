//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and the global logger swap.

use crate::log::{self, DefaultLogger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger capturing entries for inspection
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_prints_without_panic() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
    ] {
        logger.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: "galaxy3d::Test".to_string(),
            message: "message".to_string(),
            file: None,
            line: None,
        });
    }
}

#[test]
fn test_default_logger_error_with_location() {
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "galaxy3d::Test".to_string(),
        message: "chunk rejected".to_string(),
        file: Some("node_format.rs"),
        line: Some(12),
    });
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_routes_macros() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });

    crate::engine_info!("galaxy3d::LogTest", "visited {} nodes", 12);
    crate::engine_error!("galaxy3d::LogTest", "failed");

    log::reset_logger();

    // Other tests may log concurrently; keep only ours
    let entries: Vec<LogEntry> = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == "galaxy3d::LogTest")
        .cloned()
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "visited 12 nodes");
    assert!(entries[0].file.is_none());
    assert_eq!(entries[1].severity, LogSeverity::Error);
    assert!(entries[1].file.is_some());
    assert!(entries[1].line.is_some());
}

#[test]
#[serial]
fn test_reset_logger_stops_capture() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { entries: entries.clone() });
    log::reset_logger();

    crate::engine_debug!("galaxy3d::LogTest", "not captured");

    assert!(entries
        .lock()
        .unwrap()
        .iter()
        .all(|e| e.source != "galaxy3d::LogTest"));
}
