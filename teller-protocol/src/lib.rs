//! # teller-protocol
//!
//! Wire protocol for the teller UDP banking service.
//!
//! This crate provides:
//! - The 24-byte fixed header with big-endian framing
//! - Cursor-based typed body readers and writers
//! - Per-operation request/reply body types
//! - The status taxonomy carried in reply headers
//!
//! One logical message travels per datagram; there is no streaming or
//! fragmentation layer.

pub mod error;
pub mod message;
pub mod ops;
pub mod wire;

pub use error::ProtocolError;
pub use message::{Currency, Header, Message, MsgType, OpCode, Status};
pub use wire::{BodyReader, BodyWriter, HEADER_SIZE, MAGIC};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default port for the teller server.
pub const DEFAULT_PORT: u16 = 9000;

/// Receive buffer size; bounds the practical message size well below any MTU
/// the service is expected to cross.
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Header flag bit 0: request at-most-once invocation semantics.
pub const FLAG_AT_MOST_ONCE: u16 = 0x0001;
