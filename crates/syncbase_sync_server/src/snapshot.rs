//! Full and delta snapshot construction.

use crate::config::KindSchema;
use crate::error::{ServerError, ServerResult};
use chrono::{DateTime, Utc};
use syncbase_codec::{EntityRecord, Materializer};
use syncbase_storage::{RowFilter, TableStore};
use syncbase_sync_protocol::{format_watermark, KindFailure, Snapshot, Tombstone};
use tracing::{debug, warn};

/// Builds snapshots across a fixed, ordered list of kinds.
///
/// Kinds are read one after another. A kind that fails is reported in
/// [`Snapshot::failed_kinds`] and the remaining kinds are still read.
pub struct SnapshotBuilder<'a> {
    store: &'a dyn TableStore,
    kinds: &'a [KindSchema],
}

impl<'a> SnapshotBuilder<'a> {
    /// Creates a builder over `store` for `kinds`.
    pub fn new(store: &'a dyn TableStore, kinds: &'a [KindSchema]) -> Self {
        Self { store, kinds }
    }

    /// Every row of every kind. `tombstones` is always empty.
    pub fn full(&self) -> ServerResult<Snapshot> {
        let now = self.store.now()?;
        let (records, failed_kinds) = self.collect(&RowFilter::All);
        debug!(
            records = records.len(),
            failed = failed_kinds.len(),
            "built full snapshot"
        );
        Ok(Snapshot {
            records,
            tombstones: Vec::new(),
            watermark: format_watermark(now),
            failed_kinds,
        })
    }

    /// Rows modified and records deleted strictly after `since`.
    ///
    /// # Errors
    ///
    /// A failing kind is reported per kind. A failing tombstone query fails
    /// the whole delta.
    pub fn delta(&self, since: DateTime<Utc>) -> ServerResult<Snapshot> {
        // Read the clock before any query: anything written after this point
        // is newer than the watermark and shows up in the next delta.
        let now = self.store.now()?;
        let (records, failed_kinds) = self.collect(&RowFilter::ModifiedAfter(since));
        let tombstones: Vec<Tombstone> = self
            .store
            .tombstones_since(since)?
            .into_iter()
            .map(|row| Tombstone {
                id: row.id,
                deleted_time: row.deleted_time,
                kind: row.kind,
            })
            .collect();
        debug!(
            %since,
            records = records.len(),
            tombstones = tombstones.len(),
            failed = failed_kinds.len(),
            "built delta snapshot"
        );
        Ok(Snapshot {
            records,
            tombstones,
            watermark: format_watermark(now),
            failed_kinds,
        })
    }

    fn collect(&self, filter: &RowFilter) -> (Vec<EntityRecord>, Vec<KindFailure>) {
        let mut records = Vec::new();
        let mut failed = Vec::new();
        for kind in self.kinds {
            match self.read_kind(kind, filter) {
                Ok(rows) => records.extend(rows),
                Err(e) => {
                    warn!(kind = %kind.kind, error = %e, "snapshot skipped kind");
                    failed.push(KindFailure {
                        kind: kind.kind.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        (records, failed)
    }

    fn read_kind(&self, kind: &KindSchema, filter: &RowFilter) -> ServerResult<Vec<EntityRecord>> {
        read_records(self.store, kind, filter)
    }
}

/// Reads and materializes the rows of one kind matching `filter`.
pub(crate) fn read_records(
    store: &dyn TableStore,
    kind: &KindSchema,
    filter: &RowFilter,
) -> ServerResult<Vec<EntityRecord>> {
    let rows = store.scan(&kind.table(), filter)?;
    let columns = rows.columns().to_vec();
    Materializer::new(&kind.kind).materialize_rows(&columns, rows.map(|r| r.map_err(ServerError::from)))
}
