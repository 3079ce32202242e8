//! Store trait definition.

use crate::error::StorageResult;
use crate::schema::TableSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncbase_codec::RawValue;

/// Row selection for [`TableStore::scan`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    /// Every row.
    All,
    /// Rows whose `lastModifiedDate` is strictly after the given time.
    ModifiedAfter(DateTime<Utc>),
    /// The row with the given id.
    IdEquals(String),
}

/// One entry of the shared deletion log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TombstoneRow {
    /// Id of the deleted record.
    pub id: String,
    /// Kind of the deleted record.
    pub kind: String,
    /// When the deletion was recorded.
    pub deleted_time: DateTime<Utc>,
}

/// A cursor over the rows of one query.
///
/// Yields one `Vec<RawValue>` per row, aligned with [`Rows::columns`]. Each
/// step may fail independently, the way a database cursor can fail mid-scan.
pub struct Rows {
    columns: Vec<String>,
    rows: Box<dyn Iterator<Item = StorageResult<Vec<RawValue>>> + Send>,
}

impl Rows {
    /// Creates a cursor over a fallible row iterator.
    pub fn new<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: Iterator<Item = StorageResult<Vec<RawValue>>> + Send + 'static,
    {
        Self {
            columns,
            rows: Box::new(rows),
        }
    }

    /// Creates a cursor over rows that are already in memory.
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self::new(columns, rows.into_iter().map(Ok))
    }

    /// Column names, in row order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Iterator for Rows {
    type Item = StorageResult<Vec<RawValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows").field("columns", &self.columns).finish_non_exhaustive()
    }
}

/// A relational store with one table per entity kind.
///
/// Tables are addressed by name at runtime. Each entity table has at least
/// `id`, `version` and `lastModifiedDate`; a single shared log records
/// tombstones for every kind.
///
/// # Invariants
///
/// - `insert` and `update` stamp `lastModifiedDate` with [`TableStore::now`],
///   ignoring any value the caller supplied for it
/// - `insert_tombstone` stamps `deletedTime` with [`TableStore::now`]
/// - statements are individually atomic; there are no multi-statement
///   transactions
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait TableStore: Send + Sync {
    /// Returns the store's current time.
    ///
    /// Writes stamp rows from the same clock while holding the store's write
    /// lock, and `now` must not return until every write that has already
    /// read the clock is visible. A snapshot that reads `now` first and then
    /// scans therefore never misses a row stamped at or before its watermark.
    fn now(&self) -> StorageResult<DateTime<Utc>>;

    /// Creates a table, or adds the schema's missing columns to an existing
    /// one. Existing rows take the new columns' defaults.
    fn ensure_table(&self, schema: TableSchema) -> StorageResult<()>;

    /// Returns true if the table exists.
    fn has_table(&self, table: &str) -> bool;

    /// Runs `SELECT * FROM table WHERE filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist. Row-level failures are
    /// reported through the returned cursor.
    fn scan(&self, table: &str, filter: &RowFilter) -> StorageResult<Rows>;

    /// Counts rows with the given id (0 or 1).
    fn count(&self, table: &str, id: &str) -> StorageResult<u64>;

    /// Inserts one row.
    ///
    /// Omitted columns take their default.
    ///
    /// # Errors
    ///
    /// Returns an error if the table or a column is unknown, a value cannot
    /// be coerced, the id is missing, or the id already exists.
    fn insert(&self, table: &str, values: Vec<(String, RawValue)>) -> StorageResult<()>;

    /// Updates the row with the given id. Returns the number of rows changed.
    fn update(&self, table: &str, id: &str, assignments: Vec<(String, RawValue)>) -> StorageResult<u64>;

    /// Deletes the row with the given id. Returns the number of rows removed.
    fn delete(&self, table: &str, id: &str) -> StorageResult<u64>;

    /// Appends a tombstone to the deletion log.
    fn insert_tombstone(&self, id: &str, kind: &str) -> StorageResult<()>;

    /// Returns tombstones with `deletedTime` strictly after `since`, in log
    /// order.
    fn tombstones_since(&self, since: DateTime<Utc>) -> StorageResult<Vec<TombstoneRow>>;
}
