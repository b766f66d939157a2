//! Request dispatch: per-operation body decoding, ledger invocation, and
//! reply/callback assembly.

use crate::monitor::MonitorRegistry;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Instant;
use teller_bank::{Bank, BankError};
use teller_protocol::message::op_name;
use teller_protocol::ops::{
    BalanceReply, CallbackUpdate, CloseRequest, ConfirmationReply, DepositRequest, MonitorRequest,
    OpenReply, OpenRequest, QueryReply, QueryRequest, TransferReply, TransferRequest,
    WithdrawRequest,
};
use teller_protocol::{Currency, OpCode, Status};

/// What one request produced: the reply status and body, plus callback
/// updates to fan out to monitor subscribers.
#[derive(Debug)]
pub struct Outcome {
    pub status: Status,
    pub body: Bytes,
    pub callbacks: Vec<CallbackUpdate>,
}

impl Outcome {
    fn from_result(result: Result<(Bytes, Vec<CallbackUpdate>), Status>) -> Self {
        match result {
            Ok((body, callbacks)) => Self {
                status: Status::Ok,
                body,
                callbacks,
            },
            Err(status) => Self {
                status,
                body: Bytes::new(),
                callbacks: Vec::new(),
            },
        }
    }
}

/// Applies a decoded request to the ledger (or the monitor registry).
///
/// Body-parse failures become `ERR_BAD_REQUEST`; ledger rejections carry
/// their own status. Reply bodies are empty on any non-OK status.
pub fn handle_request(
    bank: &mut Bank,
    monitors: &mut MonitorRegistry,
    peer: SocketAddr,
    now: Instant,
    op: u16,
    body: &[u8],
) -> Outcome {
    let result = match OpCode::from_u16(op) {
        Some(OpCode::Open) => open(bank, body),
        Some(OpCode::Close) => close(bank, body),
        Some(OpCode::Deposit) => deposit(bank, body),
        Some(OpCode::Withdraw) => withdraw(bank, body),
        Some(OpCode::Transfer) => transfer(bank, body),
        Some(OpCode::QueryBalance) => query_balance(bank, body),
        Some(OpCode::MonitorRegister) => monitor_register(monitors, peer, now, body),
        // CALLBACK_UPDATE is never a valid request, like any unknown op
        Some(OpCode::CallbackUpdate) | None => {
            tracing::debug!("rejecting request with op {} ({})", op, op_name(op));
            Err(Status::BadRequest)
        }
    };
    Outcome::from_result(result)
}

type OpResult = Result<(Bytes, Vec<CallbackUpdate>), Status>;

fn open(bank: &mut Bank, body: &[u8]) -> OpResult {
    let req = OpenRequest::decode(body).map_err(|_| Status::BadRequest)?;
    let (account_no, balance) = bank
        .open(&req.name, &req.password, req.currency, req.initial)
        .map_err(BankError::status)?;

    let callback = CallbackUpdate {
        update_type: OpCode::Open as u16,
        account_no,
        currency: req.currency,
        new_balance: balance,
        info: format!("OPEN by {}", req.name),
    };
    Ok((OpenReply { account_no, balance }.encode(), vec![callback]))
}

fn close(bank: &mut Bank, body: &[u8]) -> OpResult {
    let req = CloseRequest::decode(body).map_err(|_| Status::BadRequest)?;
    bank.close(&req.name, req.account_no, &req.password)
        .map_err(BankError::status)?;

    // the retained record still knows the final balance and currency
    let (currency, balance) = bank
        .account(req.account_no)
        .map(|a| (a.currency, a.balance))
        .unwrap_or((Currency::Cny, 0.0));

    let callback = CallbackUpdate {
        update_type: OpCode::Close as u16,
        account_no: req.account_no,
        currency,
        new_balance: balance,
        info: format!("CLOSE by {}", req.name),
    };
    let reply = ConfirmationReply {
        message: "account closed".to_string(),
    };
    Ok((
        reply.encode().map_err(|_| Status::BadRequest)?,
        vec![callback],
    ))
}

fn deposit(bank: &mut Bank, body: &[u8]) -> OpResult {
    let req = DepositRequest::decode(body).map_err(|_| Status::BadRequest)?;
    let balance = bank
        .deposit(
            &req.name,
            req.account_no,
            &req.password,
            req.currency,
            req.amount,
        )
        .map_err(BankError::status)?;

    let callback = CallbackUpdate {
        update_type: OpCode::Deposit as u16,
        account_no: req.account_no,
        currency: req.currency,
        new_balance: balance,
        info: format!("DEPOSIT {:.6} by {}", req.amount, req.name),
    };
    Ok((BalanceReply { balance }.encode(), vec![callback]))
}

fn withdraw(bank: &mut Bank, body: &[u8]) -> OpResult {
    let req = WithdrawRequest::decode(body).map_err(|_| Status::BadRequest)?;
    let balance = bank
        .withdraw(
            &req.name,
            req.account_no,
            &req.password,
            req.currency,
            req.amount,
        )
        .map_err(BankError::status)?;

    let callback = CallbackUpdate {
        update_type: OpCode::Withdraw as u16,
        account_no: req.account_no,
        currency: req.currency,
        new_balance: balance,
        info: format!("WITHDRAW {:.6} by {}", req.amount, req.name),
    };
    Ok((BalanceReply { balance }.encode(), vec![callback]))
}

fn transfer(bank: &mut Bank, body: &[u8]) -> OpResult {
    let req = TransferRequest::decode(body).map_err(|_| Status::BadRequest)?;
    let (from_balance, to_balance) = bank
        .transfer(
            &req.name,
            req.from_account,
            &req.password,
            req.to_account,
            req.currency,
            req.amount,
        )
        .map_err(BankError::status)?;

    // one callback for the debit, one for the credit
    let callbacks = vec![
        CallbackUpdate {
            update_type: OpCode::Transfer as u16,
            account_no: req.from_account,
            currency: req.currency,
            new_balance: from_balance,
            info: format!(
                "TRANSFER out {:.6} to {} by {}",
                req.amount, req.to_account, req.name
            ),
        },
        CallbackUpdate {
            update_type: OpCode::Transfer as u16,
            account_no: req.to_account,
            currency: req.currency,
            new_balance: to_balance,
            info: format!("TRANSFER in {:.6} from {}", req.amount, req.from_account),
        },
    ];
    Ok((
        TransferReply {
            from_balance,
            to_balance,
        }
        .encode(),
        callbacks,
    ))
}

fn query_balance(bank: &mut Bank, body: &[u8]) -> OpResult {
    let req = QueryRequest::decode(body).map_err(|_| Status::BadRequest)?;
    let (currency, balance) = bank
        .query_balance(&req.name, req.account_no, &req.password)
        .map_err(BankError::status)?;

    Ok((QueryReply { currency, balance }.encode(), Vec::new()))
}

fn monitor_register(
    monitors: &mut MonitorRegistry,
    peer: SocketAddr,
    now: Instant,
    body: &[u8],
) -> OpResult {
    let req = MonitorRequest::decode(body).map_err(|_| Status::BadRequest)?;
    monitors.add(peer, req.seconds, now);
    tracing::info!("monitor add {} for {}s", peer, req.seconds);

    let reply = ConfirmationReply {
        message: format!("monitor registered for {}s", req.seconds),
    };
    Ok((reply.encode().map_err(|_| Status::BadRequest)?, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 4000))
    }

    fn handle(bank: &mut Bank, monitors: &mut MonitorRegistry, op: OpCode, body: Bytes) -> Outcome {
        handle_request(bank, monitors, peer(), Instant::now(), op as u16, &body)
    }

    fn open_account(bank: &mut Bank, monitors: &mut MonitorRegistry) -> i32 {
        let body = OpenRequest {
            name: "alice".into(),
            password: "pw".into(),
            currency: Currency::Cny,
            initial: 100.0,
        }
        .encode()
        .unwrap();
        let outcome = handle(bank, monitors, OpCode::Open, body);
        assert_eq!(outcome.status, Status::Ok);
        OpenReply::decode(&outcome.body).unwrap().account_no
    }

    #[test]
    fn test_open_reply_and_callback() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();

        let body = OpenRequest {
            name: "alice".into(),
            password: "pw".into(),
            currency: Currency::Cny,
            initial: 100.0,
        }
        .encode()
        .unwrap();
        let outcome = handle(&mut bank, &mut monitors, OpCode::Open, body);

        assert_eq!(outcome.status, Status::Ok);
        let reply = OpenReply::decode(&outcome.body).unwrap();
        assert_eq!(reply.account_no, 10001);
        assert_eq!(reply.balance, 100.0);

        assert_eq!(outcome.callbacks.len(), 1);
        let cb = &outcome.callbacks[0];
        assert_eq!(cb.update_type, OpCode::Open as u16);
        assert_eq!(cb.account_no, 10001);
        assert_eq!(cb.info, "OPEN by alice");
    }

    #[test]
    fn test_garbled_body_is_bad_request() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();

        let outcome = handle(
            &mut bank,
            &mut monitors,
            OpCode::Deposit,
            Bytes::from_static(b"\x00\x01a"),
        );
        assert_eq!(outcome.status, Status::BadRequest);
        assert!(outcome.body.is_empty());
        assert!(outcome.callbacks.is_empty());
    }

    #[test]
    fn test_unknown_op_is_bad_request() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();

        let outcome = handle_request(
            &mut bank,
            &mut monitors,
            peer(),
            Instant::now(),
            0x7777,
            &[],
        );
        assert_eq!(outcome.status, Status::BadRequest);

        let outcome = handle(&mut bank, &mut monitors, OpCode::CallbackUpdate, Bytes::new());
        assert_eq!(outcome.status, Status::BadRequest);
    }

    #[test]
    fn test_bank_error_status_with_empty_body() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();
        let no = open_account(&mut bank, &mut monitors);

        let body = QueryRequest {
            name: "alice".into(),
            account_no: no,
            password: "bad".into(),
        }
        .encode()
        .unwrap();
        let outcome = handle(&mut bank, &mut monitors, OpCode::QueryBalance, body);
        assert_eq!(outcome.status, Status::Auth);
        assert!(outcome.body.is_empty());
    }

    #[test]
    fn test_deposit_emits_callback_with_new_balance() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();
        let no = open_account(&mut bank, &mut monitors);

        let body = DepositRequest {
            name: "alice".into(),
            account_no: no,
            password: "pw".into(),
            currency: Currency::Cny,
            amount: 25.0,
        }
        .encode()
        .unwrap();
        let outcome = handle(&mut bank, &mut monitors, OpCode::Deposit, body);

        assert_eq!(outcome.status, Status::Ok);
        assert_eq!(BalanceReply::decode(&outcome.body).unwrap().balance, 125.0);
        assert_eq!(outcome.callbacks.len(), 1);
        assert_eq!(outcome.callbacks[0].new_balance, 125.0);
        assert_eq!(outcome.callbacks[0].info, "DEPOSIT 25.000000 by alice");
    }

    #[test]
    fn test_failed_deposit_emits_no_callback() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();
        let no = open_account(&mut bank, &mut monitors);

        let body = DepositRequest {
            name: "alice".into(),
            account_no: no,
            password: "pw".into(),
            currency: Currency::Sgd,
            amount: 25.0,
        }
        .encode()
        .unwrap();
        let outcome = handle(&mut bank, &mut monitors, OpCode::Deposit, body);
        assert_eq!(outcome.status, Status::Currency);
        assert!(outcome.callbacks.is_empty());
    }

    #[test]
    fn test_transfer_emits_debit_and_credit_callbacks() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();
        let from = open_account(&mut bank, &mut monitors);
        let (to, _) = bank.open("bob", "pw2", Currency::Cny, 0.0).unwrap();

        let body = TransferRequest {
            name: "alice".into(),
            from_account: from,
            password: "pw".into(),
            to_account: to,
            currency: Currency::Cny,
            amount: 75.0,
        }
        .encode()
        .unwrap();
        let outcome = handle(&mut bank, &mut monitors, OpCode::Transfer, body);

        assert_eq!(outcome.status, Status::Ok);
        let reply = TransferReply::decode(&outcome.body).unwrap();
        assert_eq!(reply.from_balance, 25.0);
        assert_eq!(reply.to_balance, 75.0);

        assert_eq!(outcome.callbacks.len(), 2);
        assert_eq!(outcome.callbacks[0].account_no, from);
        assert_eq!(
            outcome.callbacks[0].info,
            format!("TRANSFER out 75.000000 to {} by alice", to)
        );
        assert_eq!(outcome.callbacks[1].account_no, to);
        assert_eq!(
            outcome.callbacks[1].info,
            format!("TRANSFER in 75.000000 from {}", from)
        );
    }

    #[test]
    fn test_close_callback_reads_retained_record() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();
        let no = open_account(&mut bank, &mut monitors);

        let body = CloseRequest {
            name: "alice".into(),
            account_no: no,
            password: "pw".into(),
        }
        .encode()
        .unwrap();
        let outcome = handle(&mut bank, &mut monitors, OpCode::Close, body);

        assert_eq!(outcome.status, Status::Ok);
        let reply = ConfirmationReply::decode(&outcome.body).unwrap();
        assert_eq!(reply.message, "account closed");

        assert_eq!(outcome.callbacks.len(), 1);
        assert_eq!(outcome.callbacks[0].update_type, OpCode::Close as u16);
        assert_eq!(outcome.callbacks[0].new_balance, 100.0);
    }

    #[test]
    fn test_monitor_register_adds_entry() {
        let mut bank = Bank::new();
        let mut monitors = MonitorRegistry::new();

        let body = MonitorRequest { seconds: 30 }.encode();
        let outcome = handle(&mut bank, &mut monitors, OpCode::MonitorRegister, body);

        assert_eq!(outcome.status, Status::Ok);
        let reply = ConfirmationReply::decode(&outcome.body).unwrap();
        assert_eq!(reply.message, "monitor registered for 30s");
        assert_eq!(monitors.len(), 1);
        assert!(outcome.callbacks.is_empty());
    }
}
