//! Error types for the sync server.

use syncbase_codec::CodecError;
use syncbase_storage::StorageError;
use syncbase_sync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Unknown change type, missing field, or undecodable body.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The envelope names a kind the server does not serve.
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// Update target does not exist.
    #[error("{kind} {id} not found")]
    RecordNotFound {
        /// Entity kind.
        kind: String,
        /// Record id.
        id: String,
    },

    /// Store failure.
    #[error("store error: {0}")]
    Store(#[from] StorageError),

    /// Row materialization failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtocolError> for ServerError {
    fn from(e: ProtocolError) -> Self {
        ServerError::MalformedRequest(e.to_string())
    }
}

impl ServerError {
    /// Creates a malformed request error.
    pub fn malformed(message: impl Into<String>) -> Self {
        ServerError::MalformedRequest(message.into())
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::MalformedRequest(_)
                | ServerError::UnknownKind(_)
                | ServerError::RecordNotFound { .. }
                | ServerError::Store(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Codec(_) | ServerError::Internal(_) | ServerError::Io(_)
        )
    }

    /// HTTP status an HTTP layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::RecordNotFound { .. } => 404,
            e if e.is_client_error() => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::malformed("bad").is_client_error());
        assert!(ServerError::UnknownKind("Hotel".into()).is_client_error());
        assert!(ServerError::Store(StorageError::Locked).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::malformed("bad").is_server_error());
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServerError::malformed("x").status_code(), 400);
        assert_eq!(
            ServerError::Store(StorageError::UnknownTable("trip".into())).status_code(),
            400
        );
        let missing = ServerError::RecordNotFound {
            kind: "Trip".into(),
            id: "t9".into(),
        };
        assert_eq!(missing.status_code(), 404);
        assert_eq!(missing.to_string(), "Trip t9 not found");
        assert_eq!(ServerError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn protocol_errors_are_malformed() {
        let err: ServerError = ProtocolError::UnknownChangeType("merge".into()).into();
        assert!(matches!(err, ServerError::MalformedRequest(ref m) if m.contains("merge")));
    }
}
