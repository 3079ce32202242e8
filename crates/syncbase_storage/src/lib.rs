//! # SyncBase Storage
//!
//! The persistent store behind the sync engine.
//!
//! The engine sees the store as a relational database with one table per
//! entity kind, addressed by name, plus a single shared tombstone table.
//! Stores hand rows back as untyped [`RawValue`]s; interpreting them is the
//! job of `syncbase_codec`.
//!
//! ## Design Principles
//!
//! - Tables are looked up by name at runtime, never by compiled type
//! - The store, not the client, stamps `lastModifiedDate` and `deletedTime`
//! - Writes coerce values to the declared column type, like a SQL driver
//! - Stores must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral servers
//! - [`FileStore`] - Persists the whole store as one CBOR document
//!
//! ## Example
//!
//! ```rust
//! use syncbase_storage::{InMemoryStore, RowFilter, TableSchema, TableStore};
//! use syncbase_codec::RawValue;
//!
//! let store = InMemoryStore::new();
//! store.ensure_table(TableSchema::entity("Trip").text("name")).unwrap();
//! store
//!     .insert("trip", vec![("id".into(), "t1".into()), ("name".into(), "Paris".into())])
//!     .unwrap();
//!
//! let rows = store.scan("trip", &RowFilter::All).unwrap();
//! assert_eq!(rows.columns(), ["id", "version", "lastModifiedDate", "name"]);
//! ```
//!
//! [`RawValue`]: syncbase_codec::RawValue

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod error;
mod file;
mod memory;
mod schema;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use schema::{table_name, Column, ColumnType, TableSchema, TOMBSTONE_TABLE};
pub use store::{RowFilter, Rows, TableStore, TombstoneRow};
