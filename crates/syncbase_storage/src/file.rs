//! File-backed store for persistent storage.
//!
//! Directory layout:
//!
//! ```text
//! <data_dir>/
//! ├─ LOCK            # Advisory lock for single-process access
//! ├─ store.cbor      # All tables and the tombstone log
//! └─ store.cbor.tmp  # Scratch file for atomic rewrites
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::memory::{InMemoryStore, StoreData};
use crate::schema::TableSchema;
use crate::store::{RowFilter, Rows, TableStore, TombstoneRow};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syncbase_codec::RawValue;

const LOCK_FILE: &str = "LOCK";
const DATA_FILE: &str = "store.cbor";
const DATA_TEMP: &str = "store.cbor.tmp";

/// A store persisted to a data directory.
///
/// Reads are served from memory. Every successful write rewrites the data
/// file with the write-then-rename pattern, so the file on disk always holds
/// a complete store.
///
/// # Durability
///
/// A write that succeeds in memory but fails to persist is reported as an
/// error; the in-memory state is not rolled back.
///
/// # Example
///
/// ```no_run
/// use syncbase_storage::{FileStore, TableSchema, TableStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("data")).unwrap();
/// store.ensure_table(TableSchema::entity("Trip")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    memory: InMemoryStore,
    /// Serializes write-and-persist so the file never lags a later write.
    write_lock: Mutex<()>,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates a store in `path` on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory cannot be created
    /// - another process holds the lock ([`StorageError::Locked`])
    /// - the data file cannot be decoded ([`StorageError::Corrupted`])
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Opens or creates a store in `path` on the given clock.
    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked);
        }

        let data_path = path.join(DATA_FILE);
        let data = if data_path.exists() {
            let reader = BufReader::new(File::open(&data_path)?);
            ciborium::from_reader::<StoreData, _>(reader)
                .map_err(|e| StorageError::Corrupted(e.to_string()))?
        } else {
            StoreData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            memory: InMemoryStore::from_data(data, clock),
            write_lock: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the names of all tables.
    pub fn table_names(&self) -> Vec<String> {
        self.memory.table_names()
    }

    fn persist(&self) -> StorageResult<()> {
        let temp_path = self.path.join(DATA_TEMP);
        let data_path = self.path.join(DATA_FILE);

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::into_writer(&self.memory.data(), &mut writer)
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        fs::rename(&temp_path, &data_path)?;
        Ok(())
    }

    fn write<T>(&self, op: impl FnOnce(&InMemoryStore) -> StorageResult<T>) -> StorageResult<T> {
        let _guard = self.write_lock.lock();
        let result = op(&self.memory)?;
        self.persist()?;
        Ok(result)
    }
}

impl TableStore for FileStore {
    fn now(&self) -> StorageResult<DateTime<Utc>> {
        self.memory.now()
    }

    fn ensure_table(&self, schema: TableSchema) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        if self.memory.merge_schema(schema)? {
            self.persist()?;
        }
        Ok(())
    }

    fn has_table(&self, table: &str) -> bool {
        self.memory.has_table(table)
    }

    fn scan(&self, table: &str, filter: &RowFilter) -> StorageResult<Rows> {
        self.memory.scan(table, filter)
    }

    fn count(&self, table: &str, id: &str) -> StorageResult<u64> {
        self.memory.count(table, id)
    }

    fn insert(&self, table: &str, values: Vec<(String, RawValue)>) -> StorageResult<()> {
        self.write(|m| m.insert(table, values))
    }

    fn update(&self, table: &str, id: &str, assignments: Vec<(String, RawValue)>) -> StorageResult<u64> {
        self.write(|m| m.update(table, id, assignments))
    }

    fn delete(&self, table: &str, id: &str) -> StorageResult<u64> {
        self.write(|m| m.delete(table, id))
    }

    fn insert_tombstone(&self, id: &str, kind: &str) -> StorageResult<()> {
        self.write(|m| m.insert_tombstone(id, kind))
    }

    fn tombstones_since(&self, since: DateTime<Utc>) -> StorageResult<Vec<TombstoneRow>> {
        self.memory.tombstones_since(since)
    }
}
