//! Protocol error types.

use thiserror::Error;

/// Errors that can occur during wire protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Invalid pack file format.
    #[error("invalid pack file: {0}")]
    InvalidPack(String),

    /// Invalid pkt-line framing.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// Pack feature or object kind this client does not handle.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A ref-delta's base object is not present in the store.
    #[error("missing delta base: {0}")]
    MissingBase(String),

    /// No packfile could be extracted from the response.
    #[error("no packfile in response")]
    NoPack,

    /// The refs response advertised no ref for HEAD.
    #[error("no ref advertisement for HEAD")]
    MissingHead,

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-200 status.
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// Storage error while persisting or resolving objects.
    #[error("storage error: {0}")]
    Storage(#[from] gitlet_storage::StorageError),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
