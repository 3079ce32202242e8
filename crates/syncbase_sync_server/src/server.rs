//! Main sync server.

use crate::applier::{MutationApplier, MutationOutcome};
use crate::broadcast::{BroadcastReport, ChannelRegistry};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::live::LiveListener;
use crate::snapshot::SnapshotBuilder;
use std::sync::Arc;
use syncbase_storage::TableStore;
use syncbase_sync_protocol::{parse_delta_cursor, ChangeEnvelope, ChangeResponse, Snapshot};
use tracing::{info, warn};

/// The sync server.
///
/// Ties the store, the configured kinds and the live channel registry
/// together. Snapshots and mutations run synchronously on the calling
/// thread; an HTTP layer forwards request bodies here and maps errors with
/// [`ServerError::status_code`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use syncbase_storage::InMemoryStore;
/// use syncbase_sync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(Arc::new(InMemoryStore::new()), ServerConfig::default()).unwrap();
///
/// let body = br#"{"changeType":"create","kind":"Trip","recordId":"t1","fullModel":{"id":"t1"}}"#;
/// server.handle_change_json(body).unwrap();
///
/// let snapshot = server.full_snapshot().unwrap();
/// assert_eq!(snapshot.records.len(), 1);
/// ```
pub struct SyncServer {
    store: Arc<dyn TableStore>,
    config: ServerConfig,
    registry: Arc<ChannelRegistry>,
}

impl SyncServer {
    /// Creates a server, creating or extending the table of every kind.
    pub fn new(store: Arc<dyn TableStore>, config: ServerConfig) -> ServerResult<Self> {
        for kind in &config.kinds {
            store.ensure_table(kind.table_schema())?;
        }
        Ok(Self {
            store,
            config,
            registry: Arc::new(ChannelRegistry::new()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Returns the live channel registry.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Builds a full snapshot.
    pub fn full_snapshot(&self) -> ServerResult<Snapshot> {
        SnapshotBuilder::new(self.store.as_ref(), &self.config.kinds).full()
    }

    /// Builds a delta snapshot since an epoch-millisecond cursor.
    pub fn delta_snapshot(&self, since_ms: i64) -> ServerResult<Snapshot> {
        let since = parse_delta_cursor(since_ms)?;
        SnapshotBuilder::new(self.store.as_ref(), &self.config.kinds).delta(since)
    }

    /// Applies a change and broadcasts it to every live channel.
    ///
    /// Broadcast failures never fail the change; the affected channels are
    /// dropped.
    pub fn handle_change(&self, envelope: &ChangeEnvelope) -> ServerResult<ChangeResponse> {
        let (response, _) = self.handle_change_reported(envelope)?;
        Ok(response)
    }

    /// Like [`SyncServer::handle_change`], also returning the broadcast
    /// report. The report is `None` when nothing changed.
    pub fn handle_change_reported(
        &self,
        envelope: &ChangeEnvelope,
    ) -> ServerResult<(ChangeResponse, Option<BroadcastReport>)> {
        let MutationOutcome {
            response,
            notification,
        } = MutationApplier::new(self.store.as_ref(), &self.config).apply(envelope)?;

        let report = match notification {
            Some(notification) => match self.registry.broadcast(&notification) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(error = %e, "change applied but not broadcast");
                    None
                }
            },
            None => None,
        };
        Ok((response, report))
    }

    /// Decodes a JSON change envelope and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::MalformedRequest`] if the body exceeds the
    /// configured maximum or is not a valid envelope.
    pub fn handle_change_json(&self, body: &[u8]) -> ServerResult<ChangeResponse> {
        if body.len() > self.config.max_envelope_bytes {
            return Err(ServerError::malformed(format!(
                "envelope of {} bytes exceeds limit of {}",
                body.len(),
                self.config.max_envelope_bytes
            )));
        }
        let envelope = ChangeEnvelope::from_json(body)?;
        self.handle_change(&envelope)
    }

    /// Binds the live channel listener on the configured address.
    pub async fn bind_live(&self) -> ServerResult<LiveListener> {
        let listener = LiveListener::bind(self.config.live_addr, Arc::clone(&self.registry)).await?;
        info!(addr = %listener.local_addr()?, kinds = self.config.kinds.len(), "sync server ready");
        Ok(listener)
    }
}

impl std::fmt::Debug for SyncServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
