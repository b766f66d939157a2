//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding wire messages.
///
/// Every decode failure is a reject: the datagram carrying the message is
/// dropped (server) or ignored for the current receive attempt (client).
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("datagram too short for header: {0} bytes")]
    ShortHeader(usize),

    #[error("invalid magic bytes: expected \"BANK\", got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message type: {0}")]
    UnknownMsgType(u8),

    #[error("declared body length {declared} exceeds payload ({available} bytes)")]
    BodyTruncated { declared: u32, available: usize },

    #[error("body read past end at offset {offset} (wanted {wanted} more bytes)")]
    ReadPastEnd { offset: usize, wanted: usize },

    #[error("string field of {0} bytes exceeds the u16 length prefix")]
    StringTooLong(usize),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ProtocolError::InvalidMagic(*b"XXXX");
        assert!(err.to_string().contains("magic"));

        let err = ProtocolError::UnsupportedVersion(9);
        assert!(err.to_string().contains('9'));

        let err = ProtocolError::BodyTruncated {
            declared: 100,
            available: 4,
        };
        assert!(err.to_string().contains("100"));

        let err = ProtocolError::ReadPastEnd {
            offset: 12,
            wanted: 8,
        };
        assert!(err.to_string().contains("12"));
    }
}
