//! Error types for the response cache
//!
//! Provides unified error handling using thiserror. Store lookups and
//! mutations have no failure channel; only configuration and snapshot I/O fail.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the response cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// TTL is zero, negative or not a finite number
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// Route pattern could not be compiled into a matcher
    #[error("Invalid route pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Any other malformed configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Snapshot document exists but could not be read
    #[error("Failed to read snapshot {}: {source}", .path.display())]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot document could not be written
    #[error("Failed to write snapshot {}: {source}", .path.display())]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot document is not a valid JSON object of the expected shape
    #[error("Malformed snapshot {}: {source}", .path.display())]
    SnapshotFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be converted to or from a JSON payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the response cache.
pub type Result<T> = std::result::Result<T, CacheError>;
