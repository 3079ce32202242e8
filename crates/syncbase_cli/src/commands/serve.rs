//! Serve command implementation.
//!
//! Runs the live channel listener and applies newline-delimited change
//! envelopes read from an input stream, writing one JSON reply line per
//! envelope. Every applied change is broadcast to the connected channels.

use super::{open_server, render, CliResult};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use syncbase_sync_server::{ServerConfig, SyncServer};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Counts of envelopes handled during one serve session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    /// Envelopes applied.
    pub applied: usize,
    /// Envelopes rejected.
    pub rejected: usize,
}

#[derive(Serialize)]
struct ErrorReply {
    status: u16,
    error: String,
}

/// Runs the serve command until stdin closes or the process is interrupted.
pub fn run(path: &Path, config: ServerConfig, addr: Option<SocketAddr>) -> CliResult<()> {
    let config = match addr {
        Some(addr) => config.with_live_addr(addr),
        None => config,
    };
    let server = open_server(path, config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let summary = runtime.block_on(serve(&server, tokio::io::stdin(), tokio::io::stdout()))?;
    info!(applied = summary.applied, rejected = summary.rejected, "serve finished");
    Ok(())
}

/// Serves live channels while applying envelopes from `input`.
pub async fn serve<R, W>(server: &SyncServer, input: R, mut output: W) -> CliResult<ServeSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let listener = server.bind_live().await?;
    let listener_task = tokio::spawn(listener.run());

    let mut summary = ServeSummary::default();
    let mut lines = BufReader::new(input).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match server.handle_change_json(line.as_bytes()) {
            Ok(response) => {
                summary.applied += 1;
                render(&response, false)?
            }
            Err(e) => {
                summary.rejected += 1;
                warn!(status = e.status_code(), error = %e, "change rejected");
                render(
                    &ErrorReply {
                        status: e.status_code(),
                        error: e.to_string(),
                    },
                    false,
                )?
            }
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    listener_task.abort();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn local_config() -> ServerConfig {
        ServerConfig::default().with_live_addr(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    #[tokio::test]
    async fn replies_line_per_envelope() {
        let dir = TempDir::new().unwrap();
        let server = open_server(dir.path(), local_config()).unwrap();
        let input = concat!(
            r#"{"changeType": "create", "kind": "User", "fullModel": {"id": "u1"}}"#,
            "\n\n",
            r#"{"changeType": "update", "kind": "User", "recordId": "u2", "fieldChanges": {"version": {"updated": 1}}}"#,
            "\n",
            "not json\n",
            r#"{"changeType": "delete", "kind": "User", "recordId": "u1"}"#,
            "\n",
        );
        let mut output = Vec::new();

        let summary = serve(&server, input.as_bytes(), &mut output).await.unwrap();
        assert_eq!(summary, ServeSummary { applied: 2, rejected: 2 });

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0]["id"], "u1");
        assert_eq!(replies[0]["version"], 1);
        assert_eq!(replies[1]["status"], 404);
        assert_eq!(replies[2]["status"], 400);
        assert_eq!(replies[3], serde_json::json!({"id": "u1"}));
    }
}
