//! Snapshot and delta command implementations.

use super::{open_server, render, CliResult};
use std::path::Path;
use syncbase_sync_server::ServerConfig;

/// Runs the snapshot command: prints every record of every kind.
pub fn run(path: &Path, config: ServerConfig, pretty: bool) -> CliResult<()> {
    let server = open_server(path, config)?;
    let snapshot = server.full_snapshot()?;
    println!("{}", render(&snapshot, pretty)?);
    Ok(())
}

/// Runs the delta command: prints what changed after `since_ms`.
pub fn run_delta(path: &Path, config: ServerConfig, since_ms: i64, pretty: bool) -> CliResult<()> {
    let server = open_server(path, config)?;
    let snapshot = server.delta_snapshot(since_ms)?;
    println!("{}", render(&snapshot, pretty)?);
    Ok(())
}
