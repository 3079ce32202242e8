//! CLI command implementations.

pub mod apply;
pub mod init;
pub mod serve;
pub mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use syncbase_storage::{FileStore, StorageError};
use syncbase_sync_server::{ServerConfig, ServerError, SyncServer};
use thiserror::Error;

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be read.
    #[error("cannot read config {path:?}: {source}")]
    ConfigRead {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not a valid server config.
    #[error("invalid config {path:?}: {source}")]
    ConfigParse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The data directory could not be opened.
    #[error("cannot open data directory {path:?}: {source}")]
    Open {
        /// Data directory.
        path: PathBuf,
        /// Underlying error.
        source: StorageError,
    },

    /// The server rejected or failed an operation.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Output could not be rendered.
    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Loads a server config from a JSON file, or the default config.
pub fn load_config(path: Option<&Path>) -> CliResult<ServerConfig> {
    let Some(path) = path else {
        return Ok(ServerConfig::default());
    };
    let bytes = std::fs::read(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Opens the file store in `path` and builds a server over it, creating any
/// missing tables.
pub fn open_server(path: &Path, config: ServerConfig) -> CliResult<SyncServer> {
    let store = FileStore::open(path).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SyncServer::new(Arc::new(store), config)?)
}

/// Renders a value as JSON, pretty-printed on request.
pub fn render<T: serde::Serialize>(value: &T, pretty: bool) -> CliResult<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_means_defaults() {
        assert_eq!(load_config(None).unwrap(), ServerConfig::default());
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"kinds": [{"kind": "Trip", "columns": {"name": "text"}}], "maxEnvelopeBytes": 512}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.kinds.len(), 1);
        assert_eq!(config.max_envelope_bytes, 512);
    }

    #[test]
    fn bad_config_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn data_directory_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let _first = open_server(dir.path(), ServerConfig::default()).unwrap();
        let err = open_server(dir.path(), ServerConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::Open { .. }));
    }
}
