//! Request building, retry, and reply correlation.

use crate::error::ClientError;
use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use teller_protocol::ops::{
    BalanceReply, CloseRequest, ConfirmationReply, DepositRequest, MonitorRequest, OpenReply,
    OpenRequest, QueryReply, QueryRequest, TransferReply, TransferRequest, WithdrawRequest,
};
use teller_protocol::{
    Currency, Message, MsgType, OpCode, Status, FLAG_AT_MOST_ONCE, MAX_DATAGRAM_SIZE,
};
use tokio::net::UdpSocket;

/// Invocation semantics requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Semantics {
    /// The server suppresses duplicates by replaying cached replies; safe
    /// for non-idempotent operations.
    #[default]
    AtMostOnce,
    /// The server re-executes every resend; non-idempotent operations may be
    /// applied more than once when a reply is lost.
    AtLeastOnce,
}

impl Semantics {
    pub fn flags(self) -> u16 {
        match self {
            Semantics::AtMostOnce => FLAG_AT_MOST_ONCE,
            Semantics::AtLeastOnce => 0,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address.
    pub server_addr: SocketAddr,
    /// Requested invocation semantics.
    pub semantics: Semantics,
    /// Per-attempt receive timeout.
    pub timeout: Duration,
    /// Number of send attempts per call.
    pub retries: u32,
}

impl ClientConfig {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            semantics: Semantics::AtMostOnce,
            timeout: Duration::from_millis(500),
            retries: 5,
        }
    }

    pub fn with_semantics(mut self, semantics: Semantics) -> Self {
        self.semantics = semantics;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// At least one attempt is always made.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }
}

/// A connected client. Issues one RPC at a time over one UDP socket.
pub struct Client {
    pub(crate) socket: UdpSocket,
    config: ClientConfig,
    rng: SmallRng,
}

impl Client {
    /// Binds an ephemeral local socket and points it at the server.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(config.server_addr).await?;

        tracing::debug!(
            "client socket {} -> {} ({:?}, timeout {:?}, retries {})",
            socket.local_addr()?,
            config.server_addr,
            config.semantics,
            config.timeout,
            config.retries
        );

        Ok(Self {
            socket,
            config,
            rng: SmallRng::from_entropy(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one request and waits for its reply.
    ///
    /// A fresh random request id correlates the reply. Each attempt sends the
    /// identical datagram, then drains the socket until the attempt deadline:
    /// frames that fail to decode, are not replies, or carry a different
    /// request id are discarded without consuming the attempt. Only deadline
    /// expiry triggers a resend.
    pub async fn call(&mut self, op: OpCode, body: Bytes) -> Result<Message, ClientError> {
        let request_id: u64 = self.rng.gen();
        let request = Message::request(op, self.config.semantics.flags(), request_id, body);
        let datagram = request.encode();

        tracing::debug!(
            "call {} reqId={:#018x} ({} bytes)",
            op,
            request_id,
            datagram.len()
        );

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        for attempt in 1..=self.config.retries {
            self.socket.send(&datagram).await?;

            let deadline = Instant::now() + self.config.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::debug!("timeout, retry {}/{}", attempt, self.config.retries);
                    break;
                }

                let n = match tokio::time::timeout(remaining, self.socket.recv(&mut buf)).await {
                    Err(_) => continue,
                    Ok(Err(e)) => {
                        // e.g. ICMP port-unreachable surfacing on a connected
                        // socket; treated like any other lost reply
                        tracing::debug!("recv error: {}", e);
                        continue;
                    }
                    Ok(Ok(n)) => n,
                };

                let reply = match Message::decode(&buf[..n]) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::debug!("undecodable frame: {}", e);
                        continue;
                    }
                };
                if reply.header.msg_type != MsgType::Reply {
                    tracing::debug!("ignoring frame of type {:?}", reply.header.msg_type);
                    continue;
                }
                if reply.header.request_id != request_id {
                    tracing::debug!(
                        "ignoring reply for foreign reqId={:#018x}",
                        reply.header.request_id
                    );
                    continue;
                }

                tracing::debug!("reply {} status={:#06x}", op, reply.header.status);
                return Ok(reply);
            }
        }

        Err(ClientError::NoReply {
            attempts: self.config.retries,
        })
    }

    fn checked(reply: Message) -> Result<Message, ClientError> {
        match reply.status() {
            Some(Status::Ok) => Ok(reply),
            Some(status) => Err(ClientError::Server(status)),
            None => Err(ClientError::UnknownStatus(reply.header.status)),
        }
    }

    /// Opens an account; returns its number and starting balance.
    pub async fn open(
        &mut self,
        name: &str,
        password: &str,
        currency: Currency,
        initial: f64,
    ) -> Result<OpenReply, ClientError> {
        let body = OpenRequest {
            name: name.to_string(),
            password: password.to_string(),
            currency,
            initial,
        }
        .encode()?;
        let reply = Self::checked(self.call(OpCode::Open, body).await?)?;
        Ok(OpenReply::decode(&reply.body)?)
    }

    /// Closes an account; returns the server's confirmation line.
    pub async fn close(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
    ) -> Result<String, ClientError> {
        let body = CloseRequest {
            name: name.to_string(),
            account_no,
            password: password.to_string(),
        }
        .encode()?;
        let reply = Self::checked(self.call(OpCode::Close, body).await?)?;
        Ok(ConfirmationReply::decode(&reply.body)?.message)
    }

    /// Deposits into an account; returns the new balance.
    pub async fn deposit(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
        currency: Currency,
        amount: f64,
    ) -> Result<f64, ClientError> {
        let body = DepositRequest {
            name: name.to_string(),
            account_no,
            password: password.to_string(),
            currency,
            amount,
        }
        .encode()?;
        let reply = Self::checked(self.call(OpCode::Deposit, body).await?)?;
        Ok(BalanceReply::decode(&reply.body)?.balance)
    }

    /// Withdraws from an account; returns the new balance.
    pub async fn withdraw(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
        currency: Currency,
        amount: f64,
    ) -> Result<f64, ClientError> {
        let body = WithdrawRequest {
            name: name.to_string(),
            account_no,
            password: password.to_string(),
            currency,
            amount,
        }
        .encode()?;
        let reply = Self::checked(self.call(OpCode::Withdraw, body).await?)?;
        Ok(BalanceReply::decode(&reply.body)?.balance)
    }

    /// Transfers between two accounts; returns both new balances.
    pub async fn transfer(
        &mut self,
        name: &str,
        from_account: i32,
        password: &str,
        to_account: i32,
        currency: Currency,
        amount: f64,
    ) -> Result<TransferReply, ClientError> {
        let body = TransferRequest {
            name: name.to_string(),
            from_account,
            password: password.to_string(),
            to_account,
            currency,
            amount,
        }
        .encode()?;
        let reply = Self::checked(self.call(OpCode::Transfer, body).await?)?;
        Ok(TransferReply::decode(&reply.body)?)
    }

    /// Queries an account's currency and balance.
    pub async fn query_balance(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
    ) -> Result<QueryReply, ClientError> {
        let body = QueryRequest {
            name: name.to_string(),
            account_no,
            password: password.to_string(),
        }
        .encode()?;
        let reply = Self::checked(self.call(OpCode::QueryBalance, body).await?)?;
        Ok(QueryReply::decode(&reply.body)?)
    }

    /// Registers this client's address for update callbacks; returns the
    /// server's confirmation line. Follow with [`Client::run_monitor`] to
    /// actually drain the callbacks.
    pub async fn monitor_register(&mut self, seconds: u16) -> Result<String, ClientError> {
        let body = MonitorRequest { seconds }.encode();
        let reply = Self::checked(self.call(OpCode::MonitorRegister, body).await?)?;
        Ok(ConfirmationReply::decode(&reply.body)?.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantics_flags() {
        assert_eq!(Semantics::AtMostOnce.flags(), FLAG_AT_MOST_ONCE);
        assert_eq!(Semantics::AtLeastOnce.flags(), 0);
        assert_eq!(Semantics::default(), Semantics::AtMostOnce);
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.semantics, Semantics::AtMostOnce);
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.retries, 5);
    }

    #[test]
    fn test_retries_floor() {
        let config = ClientConfig::new("127.0.0.1:9000".parse().unwrap()).with_retries(0);
        assert_eq!(config.retries, 1);
    }

    #[tokio::test]
    async fn test_no_reply_after_retries() {
        // nothing is listening on this socket's peer
        let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig::new(sink.local_addr().unwrap())
            .with_timeout(Duration::from_millis(20))
            .with_retries(2);
        let mut client = Client::connect(config).await.unwrap();

        let err = client.call(OpCode::QueryBalance, Bytes::new()).await;
        assert!(matches!(err, Err(ClientError::NoReply { attempts: 2 })));
    }

    #[tokio::test]
    async fn test_call_filters_foreign_and_garbage_frames() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = ClientConfig::new(server.local_addr().unwrap())
            .with_timeout(Duration::from_millis(500))
            .with_retries(1);
        let mut client = Client::connect(config).await.unwrap();

        let echo = tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            let (n, peer) = server.recv_from(&mut buf).await.unwrap();
            let request = Message::decode(&buf[..n]).unwrap();

            // garbage, then a reply to a different request id, then the real one
            server.send_to(b"garbage", peer).await.unwrap();
            let mut foreign = Message::reply_to(&request.header);
            foreign.header.request_id ^= 1;
            server.send_to(&foreign.encode(), peer).await.unwrap();
            let real = Message::reply_to(&request.header);
            server.send_to(&real.encode(), peer).await.unwrap();
        });

        let reply = client.call(OpCode::QueryBalance, Bytes::new()).await.unwrap();
        assert_eq!(reply.header.msg_type, MsgType::Reply);
        echo.await.unwrap();
    }
}
