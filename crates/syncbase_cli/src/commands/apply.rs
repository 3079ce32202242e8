//! Apply command implementation.

use super::{open_server, render, CliResult};
use std::path::Path;
use syncbase_sync_server::ServerConfig;
use tracing::info;

/// Applies one change envelope read from `envelope` and returns the rendered
/// response.
pub fn apply(path: &Path, config: ServerConfig, envelope: &Path) -> CliResult<String> {
    let server = open_server(path, config)?;
    let body = std::fs::read(envelope)?;
    let response = server.handle_change_json(&body)?;
    info!(envelope = %envelope.display(), "change applied");
    render(&response, false)
}

/// Runs the apply command.
pub fn run(path: &Path, config: ServerConfig, envelope: &Path) -> CliResult<()> {
    println!("{}", apply(path, config, envelope)?);
    Ok(())
}
