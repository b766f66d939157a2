//! # teller-client
//!
//! Client side of the teller service: builds requests, retries on timeout,
//! correlates replies by request id, and drains server-initiated callbacks
//! after a monitor registration.
//!
//! The client performs exactly one RPC at a time over a single datagram
//! socket; there is no pipelining.

pub mod error;
pub mod invoker;
pub mod monitor;

pub use error::ClientError;
pub use invoker::{Client, ClientConfig, Semantics};
