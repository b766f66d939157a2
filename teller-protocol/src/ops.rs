//! Per-operation request and reply body types.
//!
//! Field order within each body is part of the wire contract; decoders
//! tolerate trailing bytes after the last field.

use crate::error::ProtocolError;
use crate::message::Currency;
use crate::wire::{BodyReader, BodyWriter};
use bytes::Bytes;

/// OPEN request: name, password slot, currency, initial balance.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub name: String,
    pub password: String,
    pub currency: Currency,
    pub initial: f64,
}

impl OpenRequest {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.name)?;
        w.put_password(&self.password);
        w.put_u16(self.currency.code());
        w.put_f64(self.initial);
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        let name = r.get_string()?;
        let password = r.get_password()?;
        let currency = Currency::from_u16(r.get_u16()?);
        let initial = r.get_f64()?;
        Ok(Self {
            name,
            password,
            currency,
            initial,
        })
    }
}

/// OPEN reply: freshly allocated account number and its balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenReply {
    pub account_no: i32,
    pub balance: f64,
}

impl OpenReply {
    pub fn encode(&self) -> Bytes {
        let mut w = BodyWriter::new();
        w.put_i32(self.account_no);
        w.put_f64(self.balance);
        w.finish()
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            account_no: r.get_i32()?,
            balance: r.get_f64()?,
        })
    }
}

/// CLOSE request: name, account number, password slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseRequest {
    pub name: String,
    pub account_no: i32,
    pub password: String,
}

impl CloseRequest {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.name)?;
        w.put_i32(self.account_no);
        w.put_password(&self.password);
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            name: r.get_string()?,
            account_no: r.get_i32()?,
            password: r.get_password()?,
        })
    }
}

/// Confirmation-string reply, shared by CLOSE and MONITOR_REGISTER.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationReply {
    pub message: String,
}

impl ConfirmationReply {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.message)?;
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            message: r.get_string()?,
        })
    }
}

/// DEPOSIT request: name, account number, password slot, currency, amount.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub name: String,
    pub account_no: i32,
    pub password: String,
    pub currency: Currency,
    pub amount: f64,
}

impl DepositRequest {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.name)?;
        w.put_i32(self.account_no);
        w.put_password(&self.password);
        w.put_u16(self.currency.code());
        w.put_f64(self.amount);
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            name: r.get_string()?,
            account_no: r.get_i32()?,
            password: r.get_password()?,
            currency: Currency::from_u16(r.get_u16()?),
            amount: r.get_f64()?,
        })
    }
}

/// WITHDRAW request; same layout as DEPOSIT.
#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawRequest {
    pub name: String,
    pub account_no: i32,
    pub password: String,
    pub currency: Currency,
    pub amount: f64,
}

impl WithdrawRequest {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.name)?;
        w.put_i32(self.account_no);
        w.put_password(&self.password);
        w.put_u16(self.currency.code());
        w.put_f64(self.amount);
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            name: r.get_string()?,
            account_no: r.get_i32()?,
            password: r.get_password()?,
            currency: Currency::from_u16(r.get_u16()?),
            amount: r.get_f64()?,
        })
    }
}

/// New-balance reply, shared by DEPOSIT and WITHDRAW.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceReply {
    pub balance: f64,
}

impl BalanceReply {
    pub fn encode(&self) -> Bytes {
        let mut w = BodyWriter::new();
        w.put_f64(self.balance);
        w.finish()
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            balance: r.get_f64()?,
        })
    }
}

/// TRANSFER request. The password authenticates the owner of the
/// from-account.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub name: String,
    pub from_account: i32,
    pub password: String,
    pub to_account: i32,
    pub currency: Currency,
    pub amount: f64,
}

impl TransferRequest {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.name)?;
        w.put_i32(self.from_account);
        w.put_password(&self.password);
        w.put_i32(self.to_account);
        w.put_u16(self.currency.code());
        w.put_f64(self.amount);
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            name: r.get_string()?,
            from_account: r.get_i32()?,
            password: r.get_password()?,
            to_account: r.get_i32()?,
            currency: Currency::from_u16(r.get_u16()?),
            amount: r.get_f64()?,
        })
    }
}

/// TRANSFER reply: both post-transfer balances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferReply {
    pub from_balance: f64,
    pub to_balance: f64,
}

impl TransferReply {
    pub fn encode(&self) -> Bytes {
        let mut w = BodyWriter::new();
        w.put_f64(self.from_balance);
        w.put_f64(self.to_balance);
        w.finish()
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            from_balance: r.get_f64()?,
            to_balance: r.get_f64()?,
        })
    }
}

/// QUERY_BALANCE request: name, account number, password slot.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub name: String,
    pub account_no: i32,
    pub password: String,
}

impl QueryRequest {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_string(&self.name)?;
        w.put_i32(self.account_no);
        w.put_password(&self.password);
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            name: r.get_string()?,
            account_no: r.get_i32()?,
            password: r.get_password()?,
        })
    }
}

/// QUERY_BALANCE reply: the account currency and balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryReply {
    pub currency: Currency,
    pub balance: f64,
}

impl QueryReply {
    pub fn encode(&self) -> Bytes {
        let mut w = BodyWriter::new();
        w.put_u16(self.currency.code());
        w.put_f64(self.balance);
        w.finish()
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            currency: Currency::from_u16(r.get_u16()?),
            balance: r.get_f64()?,
        })
    }
}

/// MONITOR_REGISTER request: subscription lifetime in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorRequest {
    pub seconds: u16,
}

impl MonitorRequest {
    pub fn encode(&self) -> Bytes {
        let mut w = BodyWriter::new();
        w.put_u16(self.seconds);
        w.finish()
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            seconds: r.get_u16()?,
        })
    }
}

/// CALLBACK_UPDATE body. `update_type` echoes the op code of the mutating
/// operation that produced the update.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackUpdate {
    pub update_type: u16,
    pub account_no: i32,
    pub currency: Currency,
    pub new_balance: f64,
    pub info: String,
}

impl CallbackUpdate {
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let mut w = BodyWriter::new();
        w.put_u16(self.update_type);
        w.put_i32(self.account_no);
        w.put_u16(self.currency.code());
        w.put_f64(self.new_balance);
        w.put_string(&self.info)?;
        Ok(w.finish())
    }

    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BodyReader::new(body);
        Ok(Self {
            update_type: r.get_u16()?,
            account_no: r.get_i32()?,
            currency: Currency::from_u16(r.get_u16()?),
            new_balance: r.get_f64()?,
            info: r.get_string()?,
        })
    }
}
