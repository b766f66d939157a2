//! # teller-bank
//!
//! The transaction processor behind the teller service: an in-memory ledger
//! of accounts with open/close/deposit/withdraw/transfer/query operations.
//!
//! State is process-local; the dispatcher owns a `Bank` exclusively, so
//! nothing here is synchronized.

pub mod account;
pub mod bank;
pub mod error;

pub use account::{Account, FIRST_ACCOUNT_NO};
pub use bank::Bank;
pub use error::BankError;
