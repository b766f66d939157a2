//! Server error types.

use thiserror::Error;

/// Fatal server errors. Per-datagram problems (bad frames, processor
/// rejections) never surface here; they are answered or dropped inside the
/// dispatch loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] teller_protocol::ProtocolError),
}
