//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The envelope named a change type other than create, update or delete.
    #[error("unknown change type: {0:?}")]
    UnknownChangeType(String),

    /// A delta cursor outside the representable time range.
    #[error("invalid delta cursor: {0}")]
    InvalidCursor(i64),

    /// A watermark string that is not RFC 3339.
    #[error("invalid watermark: {0:?}")]
    InvalidWatermark(String),

    /// Malformed JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
