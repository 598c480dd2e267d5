//! Error types for the Galaxy3D spatial tree
//!
//! Covers persisted chunk decoding, stream I/O, stale handles and
//! worker pool setup. Streaming aborts are not errors and never appear here.

use std::fmt;

/// Result type for spatial tree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Spatial tree errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A read ran past the end of the chunk data
    UnexpectedEndOfData {
        /// Bytes the reader needed
        needed: usize,
        /// Bytes still available
        available: usize,
    },

    /// Node chunk written with another format version
    ChunkVersionMismatch {
        /// Version this build understands
        expected: u32,
        /// Version found in the chunk header
        found: u32,
    },

    /// Structurally invalid chunk (bad magic, unknown record tag, box mismatch)
    InvalidChunk(String),

    /// Stale or unknown handle (object, node)
    InvalidResource(String),

    /// File access failure reported by a stream source
    IoError(String),

    /// Initialization failed (worker pool, stream source)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnexpectedEndOfData { needed, available } => write!(
                f,
                "Unexpected end of data: needed {} bytes, {} available",
                needed, available
            ),
            Error::ChunkVersionMismatch { expected, found } => write!(
                f,
                "Chunk version mismatch: expected {}, found {}",
                expected, found
            ),
            Error::InvalidChunk(msg) => write!(f, "Invalid chunk: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::IoError(msg) => write!(f, "I/O error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

/// Log an error and build an `Error::InvalidResource` from it.
///
/// Meant for `ok_or_else` on handle lookups:
///
/// ```ignore
/// let node = self.nodes.get(key)
///     .ok_or_else(|| engine_err!("galaxy3d::SpatialTree", "Unknown node {:?}", key))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::error::Error::InvalidResource(message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
