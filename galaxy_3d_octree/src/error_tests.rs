//! Unit tests for error.rs
//!
//! Tests Error variants, Display output and the io::Error conversion.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_unexpected_end_of_data_display() {
    let err = Error::UnexpectedEndOfData { needed: 8, available: 3 };
    let display = format!("{}", err);
    assert!(display.contains("Unexpected end of data"));
    assert!(display.contains("8"));
    assert!(display.contains("3"));
}

#[test]
fn test_chunk_version_mismatch_display() {
    let err = Error::ChunkVersionMismatch { expected: 3, found: 7 };
    let display = format!("{}", err);
    assert!(display.contains("expected 3"));
    assert!(display.contains("found 7"));
}

#[test]
fn test_invalid_chunk_display() {
    let err = Error::InvalidChunk("bad magic".to_string());
    assert_eq!(format!("{}", err), "Invalid chunk: bad magic");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("stale object key".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("stale object key"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("thread pool".to_string());
    assert!(format!("{}", err).contains("Initialization failed"));
}

// ============================================================================
// CONVERSIONS AND TRAITS
// ============================================================================

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "level.bin missing");
    let err: Error = io.into();
    match err {
        Error::IoError(msg) => assert!(msg.contains("level.bin missing")),
        other => panic!("unexpected variant {:?}", other),
    }
}

#[test]
fn test_error_is_std_error() {
    let err = Error::IoError("x".to_string());
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_result_question_mark_propagates() {
    fn inner() -> Result<u32> {
        Err(Error::InvalidChunk("truncated".to_string()))
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert_eq!(outer(), Err(Error::InvalidChunk("truncated".to_string())));
}

#[test]
fn test_engine_err_macro_builds_invalid_resource() {
    let err = crate::engine_err!("galaxy3d::Test", "node {} missing", 4);
    assert_eq!(err, Error::InvalidResource("node 4 missing".to_string()));
}
