//! Ledger error types.

use teller_protocol::Status;
use thiserror::Error;

/// Errors a ledger operation can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("password must be 1..=16 bytes")]
    PasswordFormat,

    #[error("account not found or closed")]
    NotFound,

    #[error("name/password mismatch")]
    Auth,

    #[error("currency mismatch")]
    CurrencyMismatch,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("cannot transfer an account to itself")]
    SelfTransfer,
}

impl BankError {
    /// Maps the error to the wire status carried in the reply header.
    pub fn status(self) -> Status {
        match self {
            BankError::PasswordFormat => Status::PasswordFormat,
            BankError::NotFound => Status::NotFound,
            BankError::Auth => Status::Auth,
            BankError::CurrencyMismatch => Status::Currency,
            BankError::InvalidAmount => Status::BadRequest,
            BankError::InsufficientFunds => Status::InsufficientFunds,
            BankError::SelfTransfer => Status::BadRequest,
        }
    }
}
