//! The in-memory ledger.

use crate::account::{Account, FIRST_ACCOUNT_NO};
use crate::error::BankError;
use std::collections::HashMap;
use teller_protocol::Currency;

/// The ledger. Owned exclusively by the server's dispatch loop.
#[derive(Debug)]
pub struct Bank {
    accounts: HashMap<i32, Account>,
    next_account_no: i32,
}

impl Bank {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            next_account_no: FIRST_ACCOUNT_NO,
        }
    }

    /// Looks up an open account and authenticates the caller against it.
    fn authenticated(
        &mut self,
        account_no: i32,
        name: &str,
        password: &str,
    ) -> Result<&mut Account, BankError> {
        let account = self
            .accounts
            .get_mut(&account_no)
            .filter(|a| !a.closed)
            .ok_or(BankError::NotFound)?;
        if !account.authenticate(name, password) {
            return Err(BankError::Auth);
        }
        Ok(account)
    }

    /// Opens an account and returns its number and balance.
    ///
    /// The password arrives already stripped of trailing NULs by the wire
    /// layer; an empty one is a format error. The initial balance is taken
    /// as-is; the interactive client refuses negatives before sending.
    pub fn open(
        &mut self,
        name: &str,
        password: &str,
        currency: Currency,
        initial: f64,
    ) -> Result<(i32, f64), BankError> {
        if password.is_empty() || password.len() > 16 {
            return Err(BankError::PasswordFormat);
        }

        let account_no = self.next_account_no;
        self.next_account_no += 1;

        self.accounts.insert(
            account_no,
            Account {
                account_no,
                name: name.to_string(),
                password: password.to_string(),
                currency,
                balance: initial,
                closed: false,
            },
        );

        tracing::debug!(account_no, name, %currency, "account opened");
        Ok((account_no, initial))
    }

    /// Closes an account. The record is retained so callbacks can still read
    /// its currency and final balance.
    pub fn close(&mut self, name: &str, account_no: i32, password: &str) -> Result<(), BankError> {
        let account = self.authenticated(account_no, name, password)?;
        account.closed = true;
        tracing::debug!(account_no, "account closed");
        Ok(())
    }

    /// Deposits a positive amount; returns the new balance.
    pub fn deposit(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
        currency: Currency,
        amount: f64,
    ) -> Result<f64, BankError> {
        let account = self.authenticated(account_no, name, password)?;
        if account.currency != currency {
            return Err(BankError::CurrencyMismatch);
        }
        if !(amount > 0.0) {
            return Err(BankError::InvalidAmount);
        }
        account.balance += amount;
        Ok(account.balance)
    }

    /// Withdraws a positive amount if covered; returns the new balance.
    pub fn withdraw(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
        currency: Currency,
        amount: f64,
    ) -> Result<f64, BankError> {
        let account = self.authenticated(account_no, name, password)?;
        if account.currency != currency {
            return Err(BankError::CurrencyMismatch);
        }
        if !(amount > 0.0) {
            return Err(BankError::InvalidAmount);
        }
        if account.balance < amount {
            return Err(BankError::InsufficientFunds);
        }
        account.balance -= amount;
        Ok(account.balance)
    }

    /// Moves funds between two distinct open accounts in the same currency.
    /// Authentication is against the from-account. All checks run before
    /// either balance moves.
    pub fn transfer(
        &mut self,
        name: &str,
        from_account: i32,
        password: &str,
        to_account: i32,
        currency: Currency,
        amount: f64,
    ) -> Result<(f64, f64), BankError> {
        if from_account == to_account {
            return Err(BankError::SelfTransfer);
        }

        let from = self
            .accounts
            .get(&from_account)
            .filter(|a| !a.closed)
            .ok_or(BankError::NotFound)?;
        let to = self
            .accounts
            .get(&to_account)
            .filter(|a| !a.closed)
            .ok_or(BankError::NotFound)?;

        if !from.authenticate(name, password) {
            return Err(BankError::Auth);
        }
        if from.currency != currency || to.currency != currency {
            return Err(BankError::CurrencyMismatch);
        }
        if !(amount > 0.0) {
            return Err(BankError::InvalidAmount);
        }
        if from.balance < amount {
            return Err(BankError::InsufficientFunds);
        }

        let from_balance = {
            let from = self
                .accounts
                .get_mut(&from_account)
                .ok_or(BankError::NotFound)?;
            from.balance -= amount;
            from.balance
        };
        let to_balance = {
            let to = self
                .accounts
                .get_mut(&to_account)
                .ok_or(BankError::NotFound)?;
            to.balance += amount;
            to.balance
        };
        Ok((from_balance, to_balance))
    }

    /// Returns the account's currency and balance.
    pub fn query_balance(
        &mut self,
        name: &str,
        account_no: i32,
        password: &str,
    ) -> Result<(Currency, f64), BankError> {
        let account = self.authenticated(account_no, name, password)?;
        Ok((account.currency, account.balance))
    }

    /// Raw record access for callback enrichment; returns closed accounts too.
    pub fn account(&self, account_no: i32) -> Option<&Account> {
        self.accounts.get(&account_no)
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}
