//! Init command implementation.

use super::{open_server, render, CliResult};
use serde::Serialize;
use std::path::Path;
use syncbase_sync_server::ServerConfig;

/// Tables prepared by `init`.
#[derive(Debug, Serialize)]
pub struct InitResult {
    /// Data directory.
    pub path: String,
    /// One entry per served kind.
    pub tables: Vec<TableInfo>,
}

/// A prepared table.
#[derive(Debug, Serialize)]
pub struct TableInfo {
    /// Kind name.
    pub kind: String,
    /// Table name.
    pub table: String,
    /// Column names, the implicit ones first.
    pub columns: Vec<String>,
}

/// Creates the data directory and the table of every configured kind.
pub fn init(path: &Path, config: ServerConfig) -> CliResult<InitResult> {
    let server = open_server(path, config)?;
    let tables = server
        .config()
        .kinds
        .iter()
        .map(|kind| TableInfo {
            kind: kind.kind.clone(),
            table: kind.table(),
            columns: kind.table_schema().column_names(),
        })
        .collect();
    Ok(InitResult {
        path: path.display().to_string(),
        tables,
    })
}

/// Runs the init command.
pub fn run(path: &Path, config: ServerConfig, format: &str) -> CliResult<()> {
    let result = init(path, config)?;
    if format == "json" {
        println!("{}", render(&result, true)?);
        return Ok(());
    }

    println!("Initialized {}", result.path);
    for table in &result.tables {
        println!("  {:<16} {:<16} {}", table.kind, table.table, table.columns.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_default_tables() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");

        let result = init(&data, ServerConfig::default()).unwrap();
        assert_eq!(result.tables.len(), 6);
        assert_eq!(result.tables[0].kind, "Home");
        assert_eq!(result.tables[0].table, "home");
        assert!(result.tables[0].columns.contains(&"lastModifiedDate".to_string()));
        assert!(data.join("store.cbor").exists());
    }

    #[test]
    fn init_twice_is_harmless() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), ServerConfig::default()).unwrap();
        let again = init(dir.path(), ServerConfig::default()).unwrap();
        assert_eq!(again.tables.len(), 6);
    }
}
