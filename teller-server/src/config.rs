//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;
use teller_protocol::{DEFAULT_PORT, MAX_DATAGRAM_SIZE};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Probability of dropping an incoming request datagram.
    pub loss_req: f64,
    /// Probability of dropping an outgoing reply datagram (including replayed
    /// cached replies). Callbacks are exempt.
    pub loss_rep: f64,
    /// How long cached at-most-once replies are retained.
    pub dedup_ttl: Duration,
    /// Receive buffer size.
    pub recv_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            loss_req: 0.0,
            loss_rep: 0.0,
            dedup_ttl: Duration::from_secs(60),
            recv_buffer: MAX_DATAGRAM_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Sets the loss-injection probabilities, clamped into [0, 1].
    pub fn with_loss(mut self, loss_req: f64, loss_rep: f64) -> Self {
        self.loss_req = loss_req.clamp(0.0, 1.0);
        self.loss_rep = loss_rep.clamp(0.0, 1.0);
        self
    }

    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.loss_req, 0.0);
        assert_eq!(config.loss_rep, 0.0);
        assert_eq!(config.dedup_ttl, Duration::from_secs(60));
        assert_eq!(config.recv_buffer, MAX_DATAGRAM_SIZE);
    }

    #[test]
    fn test_loss_clamping() {
        let config = ServerConfig::default().with_loss(-0.5, 1.5);
        assert_eq!(config.loss_req, 0.0);
        assert_eq!(config.loss_rep, 1.0);
    }
}
