//! WebSocket transport for live channels.
//!
//! ```text
//! Client A ──┐                          ┌── writer task A ── ws sink A
//!             ├── ChannelRegistry ──────┤
//! Client B ──┘   (broadcast_text)       └── writer task B ── ws sink B
//! ```
//!
//! Each connection gets a writer task fed by an unbounded queue, so a
//! broadcast never awaits a socket while holding the registry lock. The
//! connection's own task only reads, to notice when the peer goes away.

use crate::broadcast::{ChannelError, ChannelRegistry, LiveChannel};
use crate::error::{ServerError, ServerResult};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// A live channel backed by a WebSocket writer task.
#[derive(Debug)]
pub struct WsChannel {
    tx: mpsc::UnboundedSender<Message>,
}

impl LiveChannel for WsChannel {
    fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.tx
            .send(Message::text(text.to_owned()))
            .map_err(|_| ChannelError::Closed)
    }

    fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}

/// Runs one live connection to completion.
///
/// Performs the WebSocket handshake, registers the channel, then reads until
/// the peer closes or errors. Inbound messages are ignored. The channel is
/// deregistered before this returns.
pub async fn serve_live_connection<S>(stream: S, registry: Arc<ChannelRegistry>) -> ServerResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| ServerError::Internal(format!("websocket handshake failed: {e}")))?;
    let (mut sink, mut source) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let id = registry.register(Arc::new(WsChannel { tx }));

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(channel = %id, error = %e, "live channel read failed");
                break;
            }
        }
    }

    // Dropping the registry's handle drops the queue sender, ending the writer.
    registry.deregister(id);
    let _ = writer.await;
    Ok(())
}

/// Accepts live channel connections.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use syncbase_sync_server::{ChannelRegistry, LiveListener};
///
/// # async fn run() -> syncbase_sync_server::ServerResult<()> {
/// let registry = Arc::new(ChannelRegistry::new());
/// let listener = LiveListener::bind("127.0.0.1:8080".parse().unwrap(), registry).await?;
/// listener.run().await
/// # }
/// ```
#[derive(Debug)]
pub struct LiveListener {
    listener: TcpListener,
    registry: Arc<ChannelRegistry>,
}

impl LiveListener {
    /// Binds to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, registry: Arc<ChannelRegistry>) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the listener fails. Each connection runs on
    /// its own task.
    pub async fn run(self) -> ServerResult<()> {
        info!(addr = %self.local_addr()?, "live channel listener started");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                if let Err(e) = serve_live_connection(stream, registry).await {
                    warn!(%peer, error = %e, "live connection failed");
                }
            });
        }
    }
}
