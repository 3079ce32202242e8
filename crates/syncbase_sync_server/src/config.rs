//! Server configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use syncbase_storage::{table_name, ColumnType, TableSchema};

/// Entity kinds served when no list is configured, in snapshot order.
pub const DEFAULT_KINDS: [&str; 6] = [
    "Home",
    "User",
    "Trip",
    "TripCity",
    "FactAttraction",
    "UserAttraction",
];

/// Default cap on a change envelope body.
pub const DEFAULT_MAX_ENVELOPE_BYTES: usize = 1024 * 1024;

/// One entity kind and its entity-specific columns.
///
/// `id`, `version` and `lastModifiedDate` are implied.
///
/// ```json
/// {"kind": "Trip", "columns": {"name": "text", "cities": "json"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSchema {
    /// Kind name as clients spell it.
    pub kind: String,
    /// Extra columns by name.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnType>,
}

impl KindSchema {
    /// Creates a kind with only the sync columns.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    /// Returns the backing table's name.
    pub fn table(&self) -> String {
        table_name(&self.kind)
    }

    /// Returns the backing table's schema.
    pub fn table_schema(&self) -> TableSchema {
        self.columns
            .iter()
            .fold(TableSchema::entity(&self.kind), |schema, (name, ty)| {
                schema.column(name.clone(), *ty)
            })
    }
}

/// Configuration for the sync server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Served kinds, in snapshot order.
    pub kinds: Vec<KindSchema>,
    /// Address the live channel listener binds to.
    pub live_addr: SocketAddr,
    /// Largest accepted change envelope, in bytes.
    pub max_envelope_bytes: usize,
}

impl ServerConfig {
    /// Creates a configuration serving the given kinds.
    pub fn new(kinds: Vec<KindSchema>) -> Self {
        Self {
            kinds,
            live_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_envelope_bytes: DEFAULT_MAX_ENVELOPE_BYTES,
        }
    }

    /// Replaces the kind list.
    pub fn with_kinds(mut self, kinds: Vec<KindSchema>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Adds a kind at the end of the list, or replaces one with the same
    /// table.
    pub fn with_kind(mut self, kind: KindSchema) -> Self {
        let table = kind.table();
        match self.kinds.iter_mut().find(|k| k.table() == table) {
            Some(existing) => *existing = kind,
            None => self.kinds.push(kind),
        }
        self
    }

    /// Sets the live channel bind address.
    pub fn with_live_addr(mut self, addr: SocketAddr) -> Self {
        self.live_addr = addr;
        self
    }

    /// Sets the maximum envelope size.
    pub fn with_max_envelope_bytes(mut self, max: usize) -> Self {
        self.max_envelope_bytes = max;
        self
    }

    /// Looks up a kind. Matching is by table name, so `trip` finds `Trip`.
    pub fn kind(&self, kind: &str) -> Option<&KindSchema> {
        let table = table_name(kind);
        self.kinds.iter().find(|k| k.table() == table)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_KINDS.iter().map(|k| KindSchema::new(*k)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        let names: Vec<_> = config.kinds.iter().map(|k| k.kind.as_str()).collect();
        assert_eq!(names, DEFAULT_KINDS);
        assert_eq!(config.live_addr.port(), 8080);
        assert_eq!(config.max_envelope_bytes, DEFAULT_MAX_ENVELOPE_BYTES);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::default()
            .with_kind(KindSchema::new("Trip").with_column("name", ColumnType::Text))
            .with_kind(KindSchema::new("Note"))
            .with_max_envelope_bytes(512);

        assert_eq!(config.kinds.len(), 7);
        assert_eq!(config.kinds[2].columns.len(), 1);
        assert_eq!(config.kinds[6].kind, "Note");
        assert_eq!(config.max_envelope_bytes, 512);
    }

    #[test]
    fn kind_lookup_ignores_case() {
        let config = ServerConfig::default();
        assert_eq!(config.kind("tripcity").map(|k| k.kind.as_str()), Some("TripCity"));
        assert!(config.kind("Hotel").is_none());
    }

    #[test]
    fn table_schema_includes_sync_columns() {
        let schema = KindSchema::new("Trip")
            .with_column("name", ColumnType::Text)
            .with_column("cities", ColumnType::Json)
            .table_schema();
        assert_eq!(schema.name, "trip");
        assert_eq!(
            schema.column_names(),
            vec!["id", "version", "lastModifiedDate", "cities", "name"]
        );
    }

    #[test]
    fn config_from_json() {
        let config: ServerConfig = serde_json::from_str(
            r#"{
                "kinds": [{"kind": "Trip", "columns": {"name": "text", "cities": "json"}}],
                "liveAddr": "0.0.0.0:9000"
            }"#,
        )
        .unwrap();
        assert_eq!(config.kinds.len(), 1);
        assert_eq!(config.kinds[0].columns["cities"], ColumnType::Json);
        assert_eq!(config.live_addr.port(), 9000);
        assert_eq!(config.max_envelope_bytes, DEFAULT_MAX_ENVELOPE_BYTES);
    }
}
