//! One-shot command execution.

use crate::Commands;
use colored::Colorize;
use teller_client::{Client, ClientError};
use teller_protocol::message::op_name;

pub async fn execute(client: &mut Client, cmd: Commands) -> Result<String, ClientError> {
    match cmd {
        Commands::Menu => unreachable!("handled by main"),

        Commands::Open {
            name,
            password,
            currency,
            initial,
        } => {
            let receipt = client
                .open(&name, &password, currency.into(), initial)
                .await?;
            Ok(format!(
                "{} accountNo={} balance={}",
                "Opened".green(),
                receipt.account_no.to_string().cyan(),
                receipt.balance
            ))
        }

        Commands::Close {
            name,
            account,
            password,
        } => {
            let message = client.close(&name, account, &password).await?;
            Ok(format!("{} {}", "Closed".green(), message))
        }

        Commands::Deposit {
            name,
            account,
            password,
            currency,
            amount,
        } => {
            let balance = client
                .deposit(&name, account, &password, currency.into(), amount)
                .await?;
            Ok(format!("{} new balance={}", "Deposited".green(), balance))
        }

        Commands::Withdraw {
            name,
            account,
            password,
            currency,
            amount,
        } => {
            let balance = client
                .withdraw(&name, account, &password, currency.into(), amount)
                .await?;
            Ok(format!("{} new balance={}", "Withdrawn".green(), balance))
        }

        Commands::Query {
            name,
            account,
            password,
        } => {
            let receipt = client.query_balance(&name, account, &password).await?;
            Ok(format!("{} {}", receipt.balance, receipt.currency))
        }

        Commands::Transfer {
            name,
            from,
            password,
            to,
            currency,
            amount,
        } => {
            let receipt = client
                .transfer(&name, from, &password, to, currency.into(), amount)
                .await?;
            Ok(format!(
                "{} fromBal={} toBal={}",
                "Transferred".green(),
                receipt.from_balance,
                receipt.to_balance
            ))
        }

        Commands::Monitor { seconds } => {
            let message = client.monitor_register(seconds).await?;
            eprintln!("{} {}", "Registered:".green(), message);
            eprintln!("{}", "Waiting for callbacks...".dimmed());

            client
                .run_monitor(seconds, |update| {
                    println!(
                        "[CALLBACK] type={} acc={} cur={} newBal={} info={}",
                        op_name(update.update_type).yellow(),
                        update.account_no,
                        update.currency,
                        update.new_balance,
                        update.info
                    );
                })
                .await?;

            Ok("Monitor finished".dimmed().to_string())
        }
    }
}
