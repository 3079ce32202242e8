//! In-memory store for testing.

use crate::clock::{Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::schema::{TableSchema, TOMBSTONE_TABLE};
use crate::store::{RowFilter, Rows, TableStore, TombstoneRow};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use syncbase_codec::{RawValue, ID_FIELD, LAST_MODIFIED_FIELD};

/// Everything a store holds. Serialized as a whole by [`crate::FileStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreData {
    tables: BTreeMap<String, Table>,
    tombstones: Vec<TombstoneRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Table {
    schema: TableSchema,
    /// Rows keyed by primary key, values aligned with `schema.columns`.
    rows: BTreeMap<String, Vec<RawValue>>,
}

impl Table {
    fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    fn coerce(&self, column: &str, value: RawValue) -> StorageResult<(usize, RawValue)> {
        let idx = self
            .schema
            .column_index(column)
            .ok_or_else(|| StorageError::UnknownColumn {
                table: self.schema.name.clone(),
                column: column.to_string(),
            })?;
        let ty = self.schema.columns[idx].ty;
        let found = value.type_name();
        let coerced = ty.coerce(value).ok_or_else(|| StorageError::TypeMismatch {
            column: column.to_string(),
            expected: ty.name(),
            found,
        })?;
        Ok((idx, coerced))
    }

    fn stamp(&self, row: &mut [RawValue], now: DateTime<Utc>) {
        if let Some(idx) = self.schema.column_index(LAST_MODIFIED_FIELD) {
            row[idx] = RawValue::Timestamp(now);
        }
    }

    fn id_of(&self, row: &[RawValue]) -> Option<String> {
        let idx = self.schema.column_index(ID_FIELD)?;
        row[idx].as_text().map(str::to_string)
    }

    fn modified_after(&self, row: &[RawValue], since: DateTime<Utc>) -> bool {
        self.schema
            .column_index(LAST_MODIFIED_FIELD)
            .and_then(|idx| row[idx].as_timestamp())
            .is_some_and(|ts| ts > since)
    }
}

/// An in-memory store.
///
/// This store keeps all tables in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral servers that don't need persistence
///
/// Rows are returned in primary-key order.
///
/// # Example
///
/// ```rust
/// use syncbase_storage::{InMemoryStore, TableSchema, TableStore};
///
/// let store = InMemoryStore::new();
/// store.ensure_table(TableSchema::entity("User")).unwrap();
/// store.insert("user", vec![("id".into(), "u1".into())]).unwrap();
/// assert_eq!(store.count("user", "u1").unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store on the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_data(StoreData::default(), clock)
    }

    pub(crate) fn from_data(data: StoreData, clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(data),
            clock,
        }
    }

    /// Returns a copy of everything in the store.
    pub(crate) fn data(&self) -> StoreData {
        self.data.read().clone()
    }

    /// Returns the store's clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the names of all tables.
    pub fn table_names(&self) -> Vec<String> {
        self.data.read().tables.keys().cloned().collect()
    }

    /// Creates the table or adds its missing columns. Returns true if
    /// anything changed.
    pub(crate) fn merge_schema(&self, schema: TableSchema) -> StorageResult<bool> {
        if schema.name == TOMBSTONE_TABLE {
            return Err(StorageError::ReservedTable(schema.name));
        }
        let mut data = self.data.write();
        let Some(table) = data.tables.get_mut(&schema.name) else {
            data.tables.insert(schema.name.clone(), Table::new(schema));
            return Ok(true);
        };
        let mut changed = false;
        for column in schema.columns {
            if table.schema.column_index(&column.name).is_none() {
                for row in table.rows.values_mut() {
                    row.push(column.default.clone());
                }
                table.schema.columns.push(column);
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Returns the number of tombstones ever written.
    pub fn tombstone_count(&self) -> usize {
        self.data.read().tombstones.len()
    }
}

impl TableStore for InMemoryStore {
    fn now(&self) -> StorageResult<DateTime<Utc>> {
        // Holding the read lock orders this after any write that already
        // read the clock.
        let _data = self.data.read();
        Ok(self.clock.now())
    }

    fn ensure_table(&self, schema: TableSchema) -> StorageResult<()> {
        self.merge_schema(schema).map(|_| ())
    }

    fn has_table(&self, table: &str) -> bool {
        self.data.read().tables.contains_key(table)
    }

    fn scan(&self, table: &str, filter: &RowFilter) -> StorageResult<Rows> {
        let data = self.data.read();
        let t = data
            .tables
            .get(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        let rows: Vec<Vec<RawValue>> = match filter {
            RowFilter::All => t.rows.values().cloned().collect(),
            RowFilter::ModifiedAfter(since) => t
                .rows
                .values()
                .filter(|row| t.modified_after(row, *since))
                .cloned()
                .collect(),
            RowFilter::IdEquals(id) => t.rows.get(id).cloned().into_iter().collect(),
        };

        Ok(Rows::from_values(t.schema.column_names(), rows))
    }

    fn count(&self, table: &str, id: &str) -> StorageResult<u64> {
        let data = self.data.read();
        let t = data
            .tables
            .get(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        Ok(u64::from(t.rows.contains_key(id)))
    }

    fn insert(&self, table: &str, values: Vec<(String, RawValue)>) -> StorageResult<()> {
        let mut data = self.data.write();
        let now = self.clock.now();
        let t = data
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        let mut row: Vec<RawValue> = t.schema.columns.iter().map(|c| c.default.clone()).collect();
        for (column, value) in values {
            let (idx, value) = t.coerce(&column, value)?;
            row[idx] = value;
        }
        t.stamp(&mut row, now);

        let id = t
            .id_of(&row)
            .ok_or_else(|| StorageError::MissingPrimaryKey(table.to_string()))?;
        if t.rows.contains_key(&id) {
            return Err(StorageError::DuplicateKey {
                table: table.to_string(),
                id,
            });
        }
        t.rows.insert(id, row);
        Ok(())
    }

    fn update(&self, table: &str, id: &str, assignments: Vec<(String, RawValue)>) -> StorageResult<u64> {
        let mut data = self.data.write();
        let now = self.clock.now();
        let t = data
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        // Coerce everything up front so a bad value leaves the row untouched.
        let assignments = assignments
            .into_iter()
            .map(|(column, value)| t.coerce(&column, value))
            .collect::<StorageResult<Vec<_>>>()?;

        let Some(mut row) = t.rows.get(id).cloned() else {
            return Ok(0);
        };
        for (idx, value) in assignments {
            row[idx] = value;
        }
        t.stamp(&mut row, now);

        let new_id = t
            .id_of(&row)
            .ok_or_else(|| StorageError::MissingPrimaryKey(table.to_string()))?;
        if new_id != id {
            if t.rows.contains_key(&new_id) {
                return Err(StorageError::DuplicateKey {
                    table: table.to_string(),
                    id: new_id,
                });
            }
            t.rows.remove(id);
        }
        t.rows.insert(new_id, row);
        Ok(1)
    }

    fn delete(&self, table: &str, id: &str) -> StorageResult<u64> {
        let mut data = self.data.write();
        let t = data
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;
        Ok(u64::from(t.rows.remove(id).is_some()))
    }

    fn insert_tombstone(&self, id: &str, kind: &str) -> StorageResult<()> {
        let mut data = self.data.write();
        let deleted_time = self.clock.now();
        data.tombstones.push(TombstoneRow {
            id: id.to_string(),
            kind: kind.to_string(),
            deleted_time,
        });
        Ok(())
    }

    fn tombstones_since(&self, since: DateTime<Utc>) -> StorageResult<Vec<TombstoneRow>> {
        Ok(self
            .data
            .read()
            .tombstones
            .iter()
            .filter(|t| t.deleted_time > since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::schema::ColumnType;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn store_with_clock() -> (InMemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = InMemoryStore::with_clock(clock.clone());
        store
            .ensure_table(TableSchema::entity("Trip").text("name").json("cities"))
            .unwrap();
        (store, clock)
    }

    fn row(pairs: &[(&str, RawValue)]) -> Vec<(String, RawValue)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn scan_all(store: &InMemoryStore) -> Vec<Vec<RawValue>> {
        store
            .scan("trip", &RowFilter::All)
            .unwrap()
            .collect::<StorageResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn insert_applies_defaults_and_stamp() {
        let (store, _) = store_with_clock();
        store
            .insert("trip", row(&[("id", "t1".into()), ("name", "Paris".into())]))
            .unwrap();

        let rows = scan_all(&store);
        assert_eq!(
            rows,
            vec![vec![
                RawValue::from("t1"),
                RawValue::Integer(1),
                RawValue::Timestamp(start()),
                RawValue::from("Paris"),
                RawValue::Null,
            ]]
        );
    }

    #[test]
    fn insert_ignores_client_timestamp() {
        let (store, _) = store_with_clock();
        let bogus = start() - Duration::days(30);
        store
            .insert(
                "trip",
                row(&[("id", "t1".into()), ("lastModifiedDate", bogus.into())]),
            )
            .unwrap();
        assert_eq!(scan_all(&store)[0][2], RawValue::Timestamp(start()));
    }

    #[test]
    fn insert_rejects_duplicates_and_unknowns() {
        let (store, _) = store_with_clock();
        store.insert("trip", row(&[("id", "t1".into())])).unwrap();

        assert!(matches!(
            store.insert("trip", row(&[("id", "t1".into())])),
            Err(StorageError::DuplicateKey { .. })
        ));
        assert!(matches!(
            store.insert("trip", row(&[("id", "t2".into()), ("color", "red".into())])),
            Err(StorageError::UnknownColumn { .. })
        ));
        assert!(matches!(
            store.insert("nope", row(&[("id", "t3".into())])),
            Err(StorageError::UnknownTable(_))
        ));
        assert!(matches!(
            store.insert("trip", row(&[("name", "x".into())])),
            Err(StorageError::MissingPrimaryKey(_))
        ));
    }

    #[test]
    fn json_column_stores_bytes() {
        let (store, _) = store_with_clock();
        store
            .insert(
                "trip",
                row(&[("id", "t1".into()), ("cities", r#"["c1"]"#.into())]),
            )
            .unwrap();
        assert_eq!(scan_all(&store)[0][4], RawValue::Bytes(br#"["c1"]"#.to_vec()));
    }

    #[test]
    fn update_restamps_and_counts() {
        let (store, clock) = store_with_clock();
        store.insert("trip", row(&[("id", "t1".into())])).unwrap();

        clock.advance(Duration::seconds(10));
        let changed = store
            .update("trip", "t1", row(&[("name", "Rome".into()), ("version", RawValue::Integer(2))]))
            .unwrap();
        assert_eq!(changed, 1);

        let rows = scan_all(&store);
        assert_eq!(rows[0][1], RawValue::Integer(2));
        assert_eq!(rows[0][2], RawValue::Timestamp(start() + Duration::seconds(10)));
        assert_eq!(rows[0][3], RawValue::from("Rome"));

        assert_eq!(store.update("trip", "missing", vec![]).unwrap(), 0);
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let (store, _) = store_with_clock();
        store.insert("trip", row(&[("id", "t1".into())])).unwrap();
        let err = store
            .update("trip", "t1", row(&[("name", "ok".into()), ("version", "x".into())]))
            .unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch { .. }));
        assert_eq!(scan_all(&store)[0][3], RawValue::Null);
    }

    #[test]
    fn scan_filters() {
        let (store, clock) = store_with_clock();
        store.insert("trip", row(&[("id", "a".into())])).unwrap();
        clock.advance(Duration::seconds(1));
        store.insert("trip", row(&[("id", "b".into())])).unwrap();

        let after: Vec<_> = store
            .scan("trip", &RowFilter::ModifiedAfter(start()))
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0][0], RawValue::from("b"));

        let one: Vec<_> = store
            .scan("trip", &RowFilter::IdEquals("a".into()))
            .unwrap()
            .collect::<StorageResult<_>>()
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn delete_and_tombstones() {
        let (store, clock) = store_with_clock();
        store.insert("trip", row(&[("id", "t1".into())])).unwrap();

        clock.advance(Duration::seconds(1));
        store.insert_tombstone("t1", "Trip").unwrap();
        assert_eq!(store.delete("trip", "t1").unwrap(), 1);
        assert_eq!(store.delete("trip", "t1").unwrap(), 0);
        assert_eq!(store.count("trip", "t1").unwrap(), 0);

        assert_eq!(store.tombstones_since(start()).unwrap().len(), 1);
        assert!(store
            .tombstones_since(start() + Duration::seconds(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn tombstone_table_is_reserved() {
        let store = InMemoryStore::new();
        let err = store.ensure_table(TableSchema::entity("Tombstone")).unwrap_err();
        assert!(matches!(err, StorageError::ReservedTable(name) if name == "tombstone"));
    }

    #[test]
    fn merge_schema_reports_changes() {
        let store = InMemoryStore::new();
        assert!(store.merge_schema(TableSchema::entity("Trip")).unwrap());
        assert!(!store.merge_schema(TableSchema::entity("Trip")).unwrap());
        assert!(store.merge_schema(TableSchema::entity("Trip").text("name")).unwrap());
    }

    #[test]
    fn ensure_table_adds_columns() {
        let (store, _) = store_with_clock();
        store.insert("trip", row(&[("id", "t1".into())])).unwrap();
        store
            .ensure_table(TableSchema::entity("Trip").column("budget", ColumnType::Float))
            .unwrap();

        let rows = store.scan("trip", &RowFilter::All).unwrap();
        assert_eq!(rows.columns().last().map(String::as_str), Some("budget"));
        let values: Vec<_> = rows.collect::<StorageResult<_>>().unwrap();
        assert_eq!(values[0].len(), 6);
    }

    /// Hands out one millisecond per call and can stall a caller right
    /// after it has taken its timestamp.
    #[derive(Debug)]
    struct PausingClock {
        ticks: AtomicI64,
        pause_next: AtomicBool,
        entered: Barrier,
        resume: Barrier,
    }

    impl PausingClock {
        fn new() -> Self {
            Self {
                ticks: AtomicI64::new(0),
                pause_next: AtomicBool::new(false),
                entered: Barrier::new(2),
                resume: Barrier::new(2),
            }
        }
    }

    impl Clock for PausingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.pause_next.swap(false, Ordering::SeqCst) {
                self.entered.wait();
                self.resume.wait();
            }
            start() + Duration::milliseconds(tick)
        }
    }

    #[test]
    fn watermark_is_ordered_after_in_flight_write() {
        let clock = Arc::new(PausingClock::new());
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        store.ensure_table(TableSchema::entity("Trip")).unwrap();

        clock.pause_next.store(true, Ordering::SeqCst);
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .insert("trip", vec![("id".into(), "t1".into())])
                    .unwrap()
            })
        };
        clock.entered.wait();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let watermark = store.now().unwrap();
                let rows: Vec<_> = store
                    .scan("trip", &RowFilter::All)
                    .unwrap()
                    .collect::<StorageResult<_>>()
                    .unwrap();
                (watermark, rows)
            })
        };
        thread::sleep(std::time::Duration::from_millis(50));
        clock.resume.wait();
        writer.join().unwrap();
        let (watermark, rows) = reader.join().unwrap();

        let stamp = scan_all(&store)[0][2].as_timestamp().unwrap();
        assert!(
            !rows.is_empty() || stamp > watermark,
            "row stamped {stamp} hidden from snapshot at {watermark}"
        );
    }
}
