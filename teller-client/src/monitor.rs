//! Post-registration callback draining.

use crate::error::ClientError;
use crate::invoker::Client;
use std::time::{Duration, Instant};
use teller_protocol::ops::CallbackUpdate;
use teller_protocol::{Message, MsgType, OpCode, MAX_DATAGRAM_SIZE};

/// Poll interval while waiting for callbacks; short so the deadline is
/// re-checked promptly.
const CALLBACK_POLL: Duration = Duration::from_secs(1);

impl Client {
    /// Blocks on the client socket for `seconds`, delivering every
    /// CALLBACK_UPDATE frame to `on_update`. Anything else arriving on the
    /// socket in that window is ignored. No other RPC can be issued while
    /// this runs, as the exclusive borrow enforces.
    pub async fn run_monitor<F>(&mut self, seconds: u16, mut on_update: F) -> Result<(), ClientError>
    where
        F: FnMut(CallbackUpdate),
    {
        let deadline = Instant::now() + Duration::from_secs(u64::from(seconds));
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }

            let wait = remaining.min(CALLBACK_POLL);
            let n = match tokio::time::timeout(wait, self.socket.recv(&mut buf)).await {
                Err(_) => continue,
                Ok(Err(e)) => {
                    tracing::debug!("recv error while monitoring: {}", e);
                    continue;
                }
                Ok(Ok(n)) => n,
            };

            let message = match Message::decode(&buf[..n]) {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!("undecodable frame while monitoring: {}", e);
                    continue;
                }
            };
            if message.header.msg_type != MsgType::Callback
                || message.header.op != OpCode::CallbackUpdate as u16
            {
                continue;
            }

            match CallbackUpdate::decode(&message.body) {
                Ok(update) => on_update(update),
                Err(e) => tracing::debug!("bad callback body: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ClientConfig;
    use teller_protocol::Currency;
    use tokio::net::UdpSocket;

    #[tokio::test]
    async fn test_monitor_delivers_callbacks_until_deadline() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let mut client = Client::connect(ClientConfig::new(server_addr)).await.unwrap();

        // learn the client's address, then push two frames at it: a stray
        // non-callback frame (must be ignored) and a genuine callback
        client.socket.send(b"hello").await.unwrap();
        let pusher = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();

            let stray = Message::request(OpCode::QueryBalance, 0, 1, bytes::Bytes::new());
            server.send_to(&stray.encode(), peer).await.unwrap();

            let update = CallbackUpdate {
                update_type: OpCode::Open as u16,
                account_no: 10001,
                currency: Currency::Cny,
                new_balance: 100.0,
                info: "OPEN by alice".into(),
            };
            let frame = Message::callback(update.encode().unwrap());
            server.send_to(&frame.encode(), peer).await.unwrap();
        });

        let mut seen = Vec::new();
        client
            .run_monitor(1, |update| seen.push(update))
            .await
            .unwrap();
        pusher.await.unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].account_no, 10001);
        assert_eq!(seen[0].info, "OPEN by alice");
    }

    #[tokio::test]
    async fn test_monitor_returns_at_deadline_with_no_traffic() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut client = Client::connect(ClientConfig::new(server.local_addr().unwrap()))
            .await
            .unwrap();

        let started = Instant::now();
        client.run_monitor(0, |_| {}).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
