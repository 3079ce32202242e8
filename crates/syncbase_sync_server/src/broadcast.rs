//! Live fan-out of confirmed changes.

use crate::error::ServerResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use syncbase_sync_protocol::ChangeNotification;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A failed send on a live channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The peer went away.
    #[error("channel closed")]
    Closed,
    /// The transport rejected the frame.
    #[error("send failed: {0}")]
    Send(String),
}

/// A server-held handle to one connected client.
pub trait LiveChannel: Send + Sync {
    /// Sends one text frame.
    fn send_text(&self, text: &str) -> Result<(), ChannelError>;

    /// Releases the connection. Called once, on deregistration.
    fn close(&self) {}
}

/// Registry key of a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Channels that accepted the frame.
    pub delivered: usize,
    /// Channels that failed and were deregistered.
    pub dropped: usize,
}

/// The set of connected live channels.
///
/// One lock covers registration, deregistration and every broadcast, so
/// broadcasts reach all channels in the same order and never interleave.
/// A channel whose send fails is removed and closed; the rest still receive
/// the frame.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<ChannelId, Arc<dyn LiveChannel>>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel to the broadcast set.
    pub fn register(&self, channel: Arc<dyn LiveChannel>) -> ChannelId {
        let id = ChannelId::new();
        let mut channels = self.channels.lock();
        channels.insert(id, channel);
        info!(channel = %id, open = channels.len(), "live channel registered");
        id
    }

    /// Removes and closes a channel. Returns false if it was already gone.
    pub fn deregister(&self, id: ChannelId) -> bool {
        let mut channels = self.channels.lock();
        match channels.remove(&id) {
            Some(channel) => {
                channel.close();
                info!(channel = %id, open = channels.len(), "live channel deregistered");
                true
            }
            None => false,
        }
    }

    /// Sends a notification to every channel.
    pub fn broadcast(&self, notification: &ChangeNotification) -> ServerResult<BroadcastReport> {
        let text = notification.to_json()?;
        Ok(self.broadcast_text(&text))
    }

    /// Sends a raw text frame to every channel.
    pub fn broadcast_text(&self, text: &str) -> BroadcastReport {
        let mut channels = self.channels.lock();
        let mut report = BroadcastReport::default();
        channels.retain(|id, channel| match channel.send_text(text) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                warn!(channel = %id, error = %e, "dropping live channel");
                channel.close();
                report.dropped += 1;
                false
            }
        });
        debug!(delivered = report.delivered, dropped = report.dropped, "broadcast");
        report
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    /// Returns true if no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.len())
            .finish()
    }
}
