//! Error types for storage operations.

use std::io;
use syncbase_codec::CodecError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named table does not exist.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The table name is reserved by the store.
    #[error("table name {0} is reserved")]
    ReservedTable(String),

    /// A write referenced a column the table does not have.
    #[error("unknown column {column} in table {table}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A value could not be coerced to the column type.
    #[error("column {column} expects {expected}, got {found}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Declared column type.
        expected: &'static str,
        /// Type of the rejected value.
        found: &'static str,
    },

    /// An insert carried no usable primary key.
    #[error("missing primary key for table {0}")]
    MissingPrimaryKey(String),

    /// An insert collided with an existing primary key.
    #[error("duplicate key {id} in table {table}")]
    DuplicateKey {
        /// Table name.
        table: String,
        /// Conflicting id.
        id: String,
    },

    /// A row could not be decoded at the cursor level.
    #[error("row decode failed: {0}")]
    Decode(#[from] CodecError),

    /// The store file is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the data directory lock.
    #[error("store is locked by another process")]
    Locked,
}
