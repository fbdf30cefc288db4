//! Storage error types.

use thiserror::Error;

/// Errors that can occur during object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Malformed object identifier (odd length or non-hex input).
    #[error("invalid object id: {0}")]
    InvalidId(String),

    /// Malformed object framing or body.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Zlib stream failure.
    #[error("corrupt zlib stream: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
