//! Fault injection for store-facing tests.
//!
//! [`FaultyStore`] wraps any [`TableStore`] and fails the operations a test
//! asks it to, so the error paths of snapshots and mutations can be driven
//! deterministically.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use syncbase_codec::RawValue;
use syncbase_storage::{RowFilter, Rows, StorageError, StorageResult, TableSchema, TableStore, TombstoneRow};

/// A store operation that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `scan` on the table fails before returning a cursor.
    Scan(String),
    /// The cursor for the table fails after yielding its first row.
    MidScan(String),
    /// `insert` into the table fails.
    Insert(String),
    /// `update` on the table fails.
    Update(String),
    /// `delete` on the table fails.
    Delete(String),
    /// `insert_tombstone` fails.
    InsertTombstone,
    /// `tombstones_since` fails.
    Tombstones,
}

/// A store wrapper that fails chosen operations.
pub struct FaultyStore {
    inner: Arc<dyn TableStore>,
    faults: Mutex<HashSet<Fault>>,
}

impl FaultyStore {
    /// Wraps a store. No faults are armed.
    pub fn new(inner: Arc<dyn TableStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    /// Arms a fault until it is cleared.
    pub fn arm(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    /// Disarms a fault.
    pub fn clear(&self, fault: &Fault) {
        self.faults.lock().remove(fault);
    }

    fn check(&self, fault: Fault) -> StorageResult<()> {
        if self.faults.lock().contains(&fault) {
            return Err(injected(&fault));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FaultyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultyStore")
            .field("faults", &*self.faults.lock())
            .finish_non_exhaustive()
    }
}

fn injected(fault: &Fault) -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("injected fault: {fault:?}"),
    ))
}

impl TableStore for FaultyStore {
    fn now(&self) -> StorageResult<DateTime<Utc>> {
        self.inner.now()
    }

    fn ensure_table(&self, schema: TableSchema) -> StorageResult<()> {
        self.inner.ensure_table(schema)
    }

    fn has_table(&self, table: &str) -> bool {
        self.inner.has_table(table)
    }

    fn scan(&self, table: &str, filter: &RowFilter) -> StorageResult<Rows> {
        self.check(Fault::Scan(table.to_string()))?;
        let rows = self.inner.scan(table, filter)?;

        let mid_scan = Fault::MidScan(table.to_string());
        if !self.faults.lock().contains(&mid_scan) {
            return Ok(rows);
        }
        let columns = rows.columns().to_vec();
        let mut yielded = false;
        let failing = rows.map(move |row| {
            if yielded {
                Err(injected(&mid_scan))
            } else {
                yielded = true;
                row
            }
        });
        Ok(Rows::new(columns, failing))
    }

    fn count(&self, table: &str, id: &str) -> StorageResult<u64> {
        self.inner.count(table, id)
    }

    fn insert(&self, table: &str, values: Vec<(String, RawValue)>) -> StorageResult<()> {
        self.check(Fault::Insert(table.to_string()))?;
        self.inner.insert(table, values)
    }

    fn update(&self, table: &str, id: &str, assignments: Vec<(String, RawValue)>) -> StorageResult<u64> {
        self.check(Fault::Update(table.to_string()))?;
        self.inner.update(table, id, assignments)
    }

    fn delete(&self, table: &str, id: &str) -> StorageResult<u64> {
        self.check(Fault::Delete(table.to_string()))?;
        self.inner.delete(table, id)
    }

    fn insert_tombstone(&self, id: &str, kind: &str) -> StorageResult<()> {
        self.check(Fault::InsertTombstone)?;
        self.inner.insert_tombstone(id, kind)
    }

    fn tombstones_since(&self, since: DateTime<Utc>) -> StorageResult<Vec<TombstoneRow>> {
        self.check(Fault::Tombstones)?;
        self.inner.tombstones_since(since)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncbase_storage::InMemoryStore;

    fn store() -> FaultyStore {
        let inner = Arc::new(InMemoryStore::new());
        inner.ensure_table(TableSchema::entity("Trip")).unwrap();
        for id in ["a", "b", "c"] {
            inner.insert("trip", vec![("id".into(), id.into())]).unwrap();
        }
        FaultyStore::new(inner)
    }

    #[test]
    fn mid_scan_fails_after_first_row() {
        let store = store();
        store.arm(Fault::MidScan("trip".into()));

        let results: Vec<_> = store.scan("trip", &RowFilter::All).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn faults_can_be_cleared() {
        let store = store();
        store.arm(Fault::Delete("trip".into()));
        assert!(store.delete("trip", "a").is_err());

        store.clear(&Fault::Delete("trip".into()));
        assert_eq!(store.delete("trip", "a").unwrap(), 1);
    }
}
