//! Callback subscription registry.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A registered callback listener.
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    pub peer: SocketAddr,
    pub expires_at: Instant,
}

/// Tracks callback listeners in registration order.
///
/// Owned exclusively by the dispatch loop; entries are only removed by the
/// per-iteration sweep.
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    entries: Vec<MonitorEntry>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `peer` to receive callbacks for the next `seconds` seconds.
    pub fn add(&mut self, peer: SocketAddr, seconds: u16, now: Instant) {
        self.entries.push(MonitorEntry {
            peer,
            expires_at: now + Duration::from_secs(u64::from(seconds)),
        });
    }

    /// Drops entries whose lifetime has elapsed.
    pub fn sweep(&mut self, now: Instant) {
        self.entries.retain(|e| e.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fans a pre-encoded callback datagram out to every live listener, in
    /// registration order. Best-effort: a failed send is logged and the
    /// fan-out moves on.
    pub fn broadcast<F>(&self, bytes: &[u8], mut send: F)
    where
        F: FnMut(SocketAddr, &[u8]) -> std::io::Result<usize>,
    {
        for entry in &self.entries {
            if let Err(e) = send(entry.peer, bytes) {
                tracing::warn!("callback send to {} failed: {}", entry.peer, e);
            }
        }
    }
}
