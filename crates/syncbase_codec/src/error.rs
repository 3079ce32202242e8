//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while materializing or encoding values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A row carried a different number of values than the cursor has columns.
    #[error("row has {values} values but cursor has {columns} columns")]
    ColumnCountMismatch {
        /// Number of columns reported by the cursor.
        columns: usize,
        /// Number of values in the row.
        values: usize,
    },

    /// A structured value could not be serialized to JSON text.
    #[error("json encoding failed: {message}")]
    Json {
        /// Description of the serializer error.
        message: String,
    },
}

impl CodecError {
    /// Create a JSON encoding error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::json(err.to_string())
    }
}
