//! Client error types.

use teller_protocol::{ProtocolError, Status};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Every attempt timed out without a matching reply: the request, the
    /// reply, or the server itself was lost.
    #[error("no reply from server after {attempts} attempts")]
    NoReply { attempts: u32 },

    /// The server answered with a non-OK status.
    #[error("{}", .0.description())]
    Server(Status),

    /// The reply carried a status code this client does not know.
    #[error("unknown status code in reply: {0}")]
    UnknownStatus(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_renders_description() {
        let err = ClientError::Server(Status::Auth);
        assert!(err.to_string().contains("AUTH"));

        let err = ClientError::NoReply { attempts: 5 };
        assert!(err.to_string().contains('5'));
    }
}
