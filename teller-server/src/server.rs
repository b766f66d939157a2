//! The UDP dispatch loop.

use crate::config::ServerConfig;
use crate::dedup::{dedup_key, DedupCache};
use crate::error::ServerError;
use crate::handler::handle_request;
use crate::loss::LossInjector;
use crate::monitor::MonitorRegistry;
use std::net::SocketAddr;
use std::time::Instant;
use teller_bank::Bank;
use teller_protocol::message::op_name;
use teller_protocol::{Message, MsgType, Status, FLAG_AT_MOST_ONCE};
use tokio::net::UdpSocket;

/// UDP server for the teller service.
///
/// One task owns the socket, the ledger, the monitor registry, and the dedup
/// cache; requests are handled to completion in arrival order, so no
/// per-account locking is needed.
pub struct Server {
    socket: UdpSocket,
    config: ServerConfig,
    bank: Bank,
    monitors: MonitorRegistry,
    dedup: DedupCache,
    loss: LossInjector,
}

impl Server {
    /// Binds the server socket. Bind failure is the only fatal startup error.
    pub async fn bind(config: ServerConfig, bank: Bank) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        Ok(Self {
            loss: LossInjector::new(config.loss_req, config.loss_rep),
            dedup: DedupCache::new(config.dedup_ttl),
            monitors: MonitorRegistry::new(),
            socket,
            config,
            bank,
        })
    }

    /// The address the socket actually bound to (port 0 resolves here).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Runs the dispatch loop. Per-datagram problems are logged and skipped;
    /// only socket-level receive errors terminate the loop.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!(
            "listening on {} (lossReq={}, lossRep={})",
            self.local_addr()?,
            self.config.loss_req,
            self.config.loss_rep
        );

        let mut buf = vec![0u8; self.config.recv_buffer];

        loop {
            let (n, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!("recv error: {}", e);
                    continue;
                }
            };

            // one sweep per iteration, timed after the (possibly long)
            // receive so entries that expired while idle never fire
            let now = Instant::now();
            self.monitors.sweep(now);
            self.dedup.sweep(now);

            if self.loss.drop_request() {
                tracing::info!("DROP request from {} (simulated)", peer);
                continue;
            }

            let request = match Message::decode(&buf[..n]) {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!("bad datagram from {}: {}", peer, e);
                    continue;
                }
            };
            if request.header.msg_type != MsgType::Request {
                tracing::debug!(
                    "ignoring non-request frame from {} (type {:?})",
                    peer,
                    request.header.msg_type
                );
                continue;
            }

            let at_most_once = request.header.flags & FLAG_AT_MOST_ONCE != 0;
            let key = dedup_key(peer, request.header.request_id);

            if at_most_once {
                if let Some(cached) = self.dedup.get(&key) {
                    tracing::info!(
                        "DUP reqId={:#018x} from {}, replaying cached reply",
                        request.header.request_id,
                        peer
                    );
                    if self.loss.drop_reply() {
                        tracing::info!("DROP reply to {} (simulated)", peer);
                    } else if let Err(e) = self.socket.send_to(cached, peer).await {
                        tracing::warn!("send to {} failed: {}", peer, e);
                    }
                    continue;
                }
            }

            tracing::info!(
                "recv {} reqId={:#018x} from {} flags={:#06x}",
                op_name(request.header.op),
                request.header.request_id,
                peer,
                request.header.flags
            );

            let outcome = handle_request(
                &mut self.bank,
                &mut self.monitors,
                peer,
                now,
                request.header.op,
                &request.body,
            );

            for update in &outcome.callbacks {
                let body = match update.encode() {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!("callback encode failed: {}", e);
                        continue;
                    }
                };
                let bytes = Message::callback(body).encode();
                self.monitors
                    .broadcast(&bytes, |addr, b| self.socket.try_send_to(b, addr));
            }

            let mut reply = Message::reply_to(&request.header);
            reply.header.status = outcome.status as u16;
            reply.body = outcome.body;
            let reply_bytes = reply.encode();

            tracing::debug!(
                "reply {} status={} to {} ({} bytes)",
                op_name(request.header.op),
                outcome.status,
                peer,
                reply_bytes.len()
            );

            if at_most_once {
                self.dedup.insert(key, reply_bytes.clone(), now);
            }

            if self.loss.drop_reply() {
                tracing::info!("DROP reply to {} (simulated)", peer);
                continue;
            }
            if let Err(e) = self.socket.send_to(&reply_bytes, peer).await {
                tracing::warn!("send to {} failed: {}", peer, e);
            }
        }
    }
}

impl Server {
    /// Number of live monitor subscriptions (for tests and introspection).
    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Number of cached at-most-once replies.
    pub fn dedup_len(&self) -> usize {
        self.dedup.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use teller_protocol::ops::{OpenReply, OpenRequest};
    use teller_protocol::{Currency, OpCode};

    async fn spawn_server(config: ServerConfig) -> SocketAddr {
        let server = Server::bind(config, Bank::new()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let server = Server::bind(config, Bank::new()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.monitor_count(), 0);
        assert_eq!(server.dedup_len(), 0);
    }

    #[tokio::test]
    async fn test_request_reply_roundtrip() {
        let addr = spawn_server(ServerConfig::new("127.0.0.1:0".parse().unwrap())).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let body = OpenRequest {
            name: "alice".into(),
            password: "pw".into(),
            currency: Currency::Cny,
            initial: 100.0,
        }
        .encode()
        .unwrap();
        let request = Message::request(OpCode::Open, 0, 7, body);
        socket.send_to(&request.encode(), addr).await.unwrap();

        let mut buf = [0u8; 2048];
        let (n, _) = socket.recv_from(&mut buf).await.unwrap();
        let reply = Message::decode(&buf[..n]).unwrap();

        assert_eq!(reply.header.msg_type, MsgType::Reply);
        assert_eq!(reply.header.request_id, 7);
        assert_eq!(reply.status(), Some(Status::Ok));
        let open = OpenReply::decode(&reply.body).unwrap();
        assert_eq!(open.account_no, 10001);
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        let addr = spawn_server(ServerConfig::new("127.0.0.1:0".parse().unwrap())).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        // garbage, then a valid request: only the latter is answered
        socket.send_to(b"not a frame", addr).await.unwrap();
        let request = Message::request(OpCode::MonitorRegister, 0, 9, {
            let mut w = teller_protocol::BodyWriter::new();
            w.put_u16(5);
            w.finish()
        });
        socket.send_to(&request.encode(), addr).await.unwrap();

        let mut buf = [0u8; 2048];
        let (n, _) = socket.recv_from(&mut buf).await.unwrap();
        let reply = Message::decode(&buf[..n]).unwrap();
        assert_eq!(reply.header.request_id, 9);
    }

    #[tokio::test]
    async fn test_full_request_loss_goes_silent() {
        let config =
            ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_loss(1.0, 0.0);
        let addr = spawn_server(config).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let request = Message::request(OpCode::QueryBalance, 0, 11, Bytes::new());
        socket.send_to(&request.encode(), addr).await.unwrap();

        let timeout = tokio::time::timeout(std::time::Duration::from_millis(200), async {
            let mut buf = [0u8; 2048];
            socket.recv_from(&mut buf).await
        })
        .await;
        assert!(timeout.is_err(), "request should have been dropped");
    }
}
