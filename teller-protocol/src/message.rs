//! Message, header, and protocol enums.

use crate::error::ProtocolError;
use crate::PROTOCOL_VERSION;
use bytes::Bytes;
use std::fmt;

/// Message type carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Request = 1,
    Reply = 2,
    Callback = 3,
}

impl MsgType {
    pub fn from_u8(v: u8) -> Result<Self, ProtocolError> {
        match v {
            1 => Ok(MsgType::Request),
            2 => Ok(MsgType::Reply),
            3 => Ok(MsgType::Callback),
            other => Err(ProtocolError::UnknownMsgType(other)),
        }
    }
}

/// Operation codes.
///
/// These values are part of the wire contract and must remain stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpCode {
    Open = 1,
    Close = 2,
    Deposit = 3,
    Withdraw = 4,
    MonitorRegister = 5,
    QueryBalance = 6,
    Transfer = 7,
    CallbackUpdate = 100,
}

impl OpCode {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(OpCode::Open),
            2 => Some(OpCode::Close),
            3 => Some(OpCode::Deposit),
            4 => Some(OpCode::Withdraw),
            5 => Some(OpCode::MonitorRegister),
            6 => Some(OpCode::QueryBalance),
            7 => Some(OpCode::Transfer),
            100 => Some(OpCode::CallbackUpdate),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Open => "OPEN",
            OpCode::Close => "CLOSE",
            OpCode::Deposit => "DEPOSIT",
            OpCode::Withdraw => "WITHDRAW",
            OpCode::MonitorRegister => "MONITOR_REGISTER",
            OpCode::QueryBalance => "QUERY_BALANCE",
            OpCode::Transfer => "TRANSFER",
            OpCode::CallbackUpdate => "CALLBACK_UPDATE",
        }
    }
}

/// Renders an op code that may not be one we recognize (for log lines).
pub fn op_name(v: u16) -> &'static str {
    OpCode::from_u16(v).map(OpCode::name).unwrap_or("UNKNOWN_OP")
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Account currency. Equality on the wire is exact; there is no conversion.
///
/// Codes outside the known set are carried through as `Unknown` rather than
/// rejected at decode time: whether a currency fits an operation is the
/// ledger's call, not the codec's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Cny,
    Sgd,
    Unknown(u16),
}

impl Currency {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => Currency::Cny,
            1 => Currency::Sgd,
            other => Currency::Unknown(other),
        }
    }

    /// The wire code for this currency.
    pub fn code(self) -> u16 {
        match self {
            Currency::Cny => 0,
            Currency::Sgd => 1,
            Currency::Unknown(v) => v,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Currency::Cny => "CNY",
            Currency::Sgd => "SGD",
            Currency::Unknown(_) => "UNKNOWN",
        }
    }

    /// Parses the currency names the interactive client accepts.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CNY" => Some(Currency::Cny),
            "SGD" => Some(Currency::Sgd),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status codes carried in reply headers.
///
/// Requests and callbacks always carry `Ok` (zero). Reply bodies are empty
/// whenever the status is not `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    Ok = 0,
    BadRequest = 1,
    Auth = 2,
    NotFound = 3,
    Currency = 4,
    InsufficientFunds = 5,
    PasswordFormat = 6,
}

impl Status {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(Status::Ok),
            1 => Some(Status::BadRequest),
            2 => Some(Status::Auth),
            3 => Some(Status::NotFound),
            4 => Some(Status::Currency),
            5 => Some(Status::InsufficientFunds),
            6 => Some(Status::PasswordFormat),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Stable code string, as logged by the server.
    pub fn code(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "ERR_BAD_REQUEST",
            Status::Auth => "ERR_AUTH",
            Status::NotFound => "ERR_NOT_FOUND",
            Status::Currency => "ERR_CURRENCY",
            Status::InsufficientFunds => "ERR_INSUFFICIENT_FUNDS",
            Status::PasswordFormat => "ERR_PASSWORD_FORMAT",
        }
    }

    /// Human-readable description rendered by the interactive client.
    pub fn description(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "request format error (BAD_REQUEST)",
            Status::Auth => "authentication failed: name/account/password mismatch (AUTH)",
            Status::NotFound => "account not found or already closed (NOT_FOUND)",
            Status::Currency => "currency mismatch (CURRENCY)",
            Status::InsufficientFunds => "insufficient funds (INSUFFICIENT_FUNDS)",
            Status::PasswordFormat => "password format error: must be 1..16 bytes (PASSWORD_FORMAT)",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The fixed-layout message header.
///
/// `body_len` is not stored; it is recomputed from the body on encode and
/// validated against the payload on decode. `op` and `status` stay raw so a
/// reply for an unrecognized op code can still echo it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub msg_type: MsgType,
    pub op: u16,
    pub flags: u16,
    pub status: u16,
    pub request_id: u64,
}

/// A complete wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: Header,
    pub body: Bytes,
}

impl Message {
    /// Builds a client request.
    pub fn request(op: OpCode, flags: u16, request_id: u64, body: Bytes) -> Self {
        Self {
            header: Header {
                version: PROTOCOL_VERSION,
                msg_type: MsgType::Request,
                op: op as u16,
                flags,
                status: 0,
                request_id,
            },
            body,
        }
    }

    /// Builds the reply skeleton for a request: op code, flags, and request id
    /// are copied, status starts at `Ok`, body starts empty.
    pub fn reply_to(request: &Header) -> Self {
        Self {
            header: Header {
                version: PROTOCOL_VERSION,
                msg_type: MsgType::Reply,
                op: request.op,
                flags: request.flags,
                status: Status::Ok as u16,
                request_id: request.request_id,
            },
            body: Bytes::new(),
        }
    }

    /// Builds a server-initiated callback frame. Callbacks correlate to no
    /// request, so the request id is zero.
    pub fn callback(body: Bytes) -> Self {
        Self {
            header: Header {
                version: PROTOCOL_VERSION,
                msg_type: MsgType::Callback,
                op: OpCode::CallbackUpdate as u16,
                flags: 0,
                status: 0,
                request_id: 0,
            },
            body,
        }
    }

    /// Status parsed from the header, if it is one we recognize.
    pub fn status(&self) -> Option<Status> {
        Status::from_u16(self.header.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_from_u8() {
        assert_eq!(MsgType::from_u8(1).unwrap(), MsgType::Request);
        assert_eq!(MsgType::from_u8(2).unwrap(), MsgType::Reply);
        assert_eq!(MsgType::from_u8(3).unwrap(), MsgType::Callback);
        assert!(MsgType::from_u8(0).is_err());
        assert!(MsgType::from_u8(4).is_err());
    }

    #[test]
    fn test_op_code_values() {
        assert_eq!(OpCode::Open as u16, 1);
        assert_eq!(OpCode::Close as u16, 2);
        assert_eq!(OpCode::Deposit as u16, 3);
        assert_eq!(OpCode::Withdraw as u16, 4);
        assert_eq!(OpCode::MonitorRegister as u16, 5);
        assert_eq!(OpCode::QueryBalance as u16, 6);
        assert_eq!(OpCode::Transfer as u16, 7);
        assert_eq!(OpCode::CallbackUpdate as u16, 100);
    }

    #[test]
    fn test_op_code_roundtrip() {
        for v in [1u16, 2, 3, 4, 5, 6, 7, 100] {
            let op = OpCode::from_u16(v).unwrap();
            assert_eq!(op as u16, v);
        }
        assert!(OpCode::from_u16(8).is_none());
        assert_eq!(op_name(99), "UNKNOWN_OP");
        assert_eq!(op_name(7), "TRANSFER");
    }

    #[test]
    fn test_currency() {
        assert_eq!(Currency::from_u16(0), Currency::Cny);
        assert_eq!(Currency::from_u16(1), Currency::Sgd);
        assert_eq!(Currency::from_u16(7), Currency::Unknown(7));
        assert_eq!(Currency::Cny.code(), 0);
        assert_eq!(Currency::Sgd.code(), 1);
        assert_eq!(Currency::Unknown(7).code(), 7);
        assert_eq!(Currency::parse("cny"), Some(Currency::Cny));
        assert_eq!(Currency::parse("SGD"), Some(Currency::Sgd));
        assert_eq!(Currency::parse("usd"), None);
        assert_eq!(Currency::Cny.to_string(), "CNY");
        assert_eq!(Currency::Unknown(7).to_string(), "UNKNOWN");
    }

    #[test]
    fn test_status_roundtrip() {
        for v in 0u16..=6 {
            let status = Status::from_u16(v).unwrap();
            assert_eq!(status as u16, v);
        }
        assert!(Status::from_u16(7).is_none());
        assert!(Status::Ok.is_ok());
        assert!(!Status::Auth.is_ok());
        assert_eq!(Status::NotFound.code(), "ERR_NOT_FOUND");
    }

    #[test]
    fn test_reply_skeleton_copies_correlation_fields() {
        let req = Message::request(OpCode::Deposit, crate::FLAG_AT_MOST_ONCE, 0xDEAD_BEEF, Bytes::new());
        let rep = Message::reply_to(&req.header);

        assert_eq!(rep.header.msg_type, MsgType::Reply);
        assert_eq!(rep.header.op, OpCode::Deposit as u16);
        assert_eq!(rep.header.flags, crate::FLAG_AT_MOST_ONCE);
        assert_eq!(rep.header.request_id, 0xDEAD_BEEF);
        assert_eq!(rep.status(), Some(Status::Ok));
        assert!(rep.body.is_empty());
    }

    #[test]
    fn test_callback_has_zero_request_id() {
        let cb = Message::callback(Bytes::from_static(b"x"));
        assert_eq!(cb.header.msg_type, MsgType::Callback);
        assert_eq!(cb.header.op, OpCode::CallbackUpdate as u16);
        assert_eq!(cb.header.request_id, 0);
        assert_eq!(cb.header.flags, 0);
    }
}
