//! Error types for GenKV
//!
//! Provides a unified error type for all storage operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using GenKvError
pub type Result<T> = std::result::Result<T, GenKvError>;

/// Unified error type for GenKV operations
#[derive(Debug, Error)]
pub enum GenKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// The file was written by an incompatible format version. Not recoverable.
    #[error("Unknown file version {version} in {}", path.display())]
    UnsupportedVersion { path: PathBuf, version: i64 },

    /// Structurally invalid mapped data (bad offset, truncated record, ...)
    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    /// The storage handle was closed while (or before) the operation ran.
    #[error("Storage is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenKvError {
    /// True for the "used after shutdown" error, as opposed to real failures
    pub fn is_closed(&self) -> bool {
        matches!(self, GenKvError::Closed)
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        GenKvError::Corruption(msg.into())
    }
}
