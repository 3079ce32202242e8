//! Test fixtures and server helpers.
//!
//! Provides a ready-to-use sync server over the travel kinds, on a manual
//! clock so tests control every timestamp.

use crate::channels::RecordingChannel;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use syncbase_storage::{ColumnType, FileStore, InMemoryStore, ManualClock, TableStore};
use syncbase_sync_protocol::{watermark_to_cursor, ChangeEnvelope, ChangeResponse, FieldChange, Snapshot};
use syncbase_sync_server::{ChannelId, KindSchema, ServerConfig, ServerResult, SyncServer};
use tempfile::TempDir;

/// Where every [`TestServer`] clock starts: 2024-01-01T00:00:00Z.
pub fn epoch_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid start time")
}

/// The default kinds with a few entity columns each.
pub fn travel_kinds() -> Vec<KindSchema> {
    vec![
        KindSchema::new("Home")
            .with_column("name", ColumnType::Text)
            .with_column("city", ColumnType::Text),
        KindSchema::new("User")
            .with_column("name", ColumnType::Text)
            .with_column("email", ColumnType::Text),
        KindSchema::new("Trip")
            .with_column("name", ColumnType::Text)
            .with_column("cities", ColumnType::Json)
            .with_column("startDate", ColumnType::Timestamp),
        KindSchema::new("TripCity")
            .with_column("tripId", ColumnType::Text)
            .with_column("city", ColumnType::Text)
            .with_column("nights", ColumnType::Integer),
        KindSchema::new("FactAttraction")
            .with_column("name", ColumnType::Text)
            .with_column("rating", ColumnType::Float)
            .with_column("tags", ColumnType::Json),
        KindSchema::new("UserAttraction")
            .with_column("userId", ColumnType::Text)
            .with_column("attractionId", ColumnType::Text)
            .with_column("visited", ColumnType::Boolean),
    ]
}

/// A server configuration over [`travel_kinds`].
pub fn travel_config() -> ServerConfig {
    ServerConfig::default().with_kinds(travel_kinds())
}

/// A sync server with a manual clock and automatic cleanup.
pub struct TestServer {
    /// The server instance.
    pub server: SyncServer,
    /// The clock behind every store timestamp.
    pub clock: Arc<ManualClock>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestServer {
    /// Creates a server over an in-memory store and the travel kinds.
    pub fn new() -> Self {
        Self::with_config(travel_config())
    }

    /// Creates a server over an in-memory store.
    pub fn with_config(config: ServerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(epoch_start()));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        Self::with_store(store, clock, config)
    }

    /// Creates a server over a caller-built store. `clock` must be the
    /// store's clock.
    pub fn with_store(store: Arc<dyn TableStore>, clock: Arc<ManualClock>, config: ServerConfig) -> Self {
        Self {
            server: SyncServer::new(store, config).expect("Failed to create server"),
            clock,
            _temp_dir: None,
        }
    }

    /// Creates a server over a file store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::new(epoch_start()));
        let store = FileStore::open_with_clock(temp_dir.path(), clock.clone())
            .expect("Failed to open file store");
        Self {
            server: SyncServer::new(Arc::new(store), travel_config()).expect("Failed to create server"),
            clock,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Moves the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: i64) {
        self.clock.advance(Duration::milliseconds(ms));
    }

    /// Registers a recording channel.
    pub fn connect(&self) -> Arc<RecordingChannel> {
        self.connect_with_id().0
    }

    /// Registers a recording channel and returns its registry id too.
    pub fn connect_with_id(&self) -> (Arc<RecordingChannel>, ChannelId) {
        let channel = Arc::new(RecordingChannel::new());
        let id = self.server.registry().register(channel.clone());
        (channel, id)
    }

    /// Submits a create.
    pub fn create(&self, kind: &str, model: Value) -> ServerResult<ChangeResponse> {
        let model = match model {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.server.handle_change(&ChangeEnvelope::create(kind, model))
    }

    /// Submits an update carrying `version` as the client's last-seen
    /// version and one field change per entry of `fields`.
    pub fn update(&self, kind: &str, id: &str, version: i64, fields: Value) -> ServerResult<ChangeResponse> {
        let mut changes: BTreeMap<String, FieldChange> = match fields {
            Value::Object(map) => map.into_iter().map(|(k, v)| (k, FieldChange::to(v))).collect(),
            _ => BTreeMap::new(),
        };
        changes.insert("version".to_string(), FieldChange::to(version));
        self.server.handle_change(&ChangeEnvelope::update(kind, id, changes))
    }

    /// Submits a delete.
    pub fn delete(&self, kind: &str, id: &str) -> ServerResult<ChangeResponse> {
        self.server.handle_change(&ChangeEnvelope::delete(kind, id))
    }

    /// Returns the record with `id` from a fresh full snapshot.
    pub fn fetch(&self, kind: &str, id: &str) -> Option<Value> {
        let snapshot = self.server.full_snapshot().expect("Failed to build snapshot");
        find_record(&snapshot, kind, id)
    }
}

impl Default for TestServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestServer {
    type Target = SyncServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

/// Returns the delta cursor a client derives from a snapshot.
pub fn cursor_of(snapshot: &Snapshot) -> i64 {
    watermark_to_cursor(&snapshot.watermark).expect("Snapshot watermark is RFC 3339")
}

/// Finds a record in a snapshot by kind tag and id.
pub fn find_record(snapshot: &Snapshot, kind: &str, id: &str) -> Option<Value> {
    snapshot
        .records
        .iter()
        .find(|r| r.kind() == Some(kind) && r.id().as_deref() == Some(id))
        .map(|r| Value::from(r.clone()))
}
