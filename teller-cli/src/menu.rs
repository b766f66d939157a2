//! Interactive menu.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use teller_client::{Client, ClientError};
use teller_protocol::message::op_name;
use teller_protocol::Currency;

type Repl = Editor<(), DefaultHistory>;

const MENU_TEXT: &str = "
== Menu ==
1) OPEN account
2) CLOSE account
3) DEPOSIT (non-idempotent)
4) WITHDRAW (non-idempotent)
5) QUERY balance (idempotent)
6) TRANSFER (non-idempotent)
7) MONITOR register (callback)
0) EXIT
";

pub async fn run(client: &mut Client) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "teller CLI".bold().cyan());
    println!(
        "server={} sem={:?} timeout={:?} retry={}",
        client.config().server_addr,
        client.config().semantics,
        client.config().timeout,
        client.config().retries
    );

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Repl = Editor::with_config(config)?;

    loop {
        println!("{}", MENU_TEXT);
        let choice = match rl.readline(&format!("{} ", "choose>".cyan())) {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match choice.as_str() {
            "0" | "q" | "exit" => break,
            "1" => handle_open(&mut rl, client).await,
            "2" => handle_close(&mut rl, client).await,
            "3" => handle_deposit(&mut rl, client).await,
            "4" => handle_withdraw(&mut rl, client).await,
            "5" => handle_query(&mut rl, client).await,
            "6" => handle_transfer(&mut rl, client).await,
            "7" => handle_monitor(&mut rl, client).await,
            "" => continue,
            other => println!("Unknown option: {}", other),
        }
    }

    println!("{}", "Bye.".dimmed());
    Ok(())
}

/// Reads one line; `None` on 'q', Ctrl-C/Ctrl-D, or a readline error.
fn prompt(rl: &mut Repl, text: &str) -> Option<String> {
    match rl.readline(text) {
        Ok(line) => {
            let line = line.trim().to_string();
            if line.eq_ignore_ascii_case("q") {
                None
            } else {
                Some(line)
            }
        }
        Err(_) => None,
    }
}

fn prompt_nonempty(rl: &mut Repl, text: &str) -> Option<String> {
    let line = prompt(rl, text)?;
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

fn prompt_i32(rl: &mut Repl, text: &str) -> Option<i32> {
    let line = prompt_nonempty(rl, text)?;
    match line.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Invalid number");
            None
        }
    }
}

fn prompt_u16(rl: &mut Repl, text: &str) -> Option<u16> {
    let line = prompt_nonempty(rl, text)?;
    match line.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Invalid number");
            None
        }
    }
}

fn prompt_f64(rl: &mut Repl, text: &str) -> Option<f64> {
    let line = prompt_nonempty(rl, text)?;
    match line.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            println!("Invalid number");
            None
        }
    }
}

fn prompt_account(rl: &mut Repl, text: &str) -> Option<i32> {
    let account = prompt_i32(rl, text)?;
    if account <= 0 {
        println!("Account number must be positive.");
        return None;
    }
    Some(account)
}

fn prompt_amount(rl: &mut Repl) -> Option<f64> {
    let amount = prompt_f64(rl, "amount ('q' to cancel): ")?;
    if amount <= 0.0 {
        println!("Amount must be positive.");
        return None;
    }
    Some(amount)
}

fn prompt_currency(rl: &mut Repl) -> Option<Currency> {
    loop {
        let line = prompt(rl, "currency (CNY/SGD, 'q' to cancel): ")?;
        match Currency::parse(&line) {
            Some(currency) => return Some(currency),
            None => println!("Invalid currency. Please enter CNY or SGD."),
        }
    }
}

fn prompt_password(rl: &mut Repl) -> Option<String> {
    let password = prompt(rl, "password ('q' to cancel): ")?;
    Some(password)
}

/// Password entry for OPEN: length-checked and confirmed.
fn prompt_new_password(rl: &mut Repl) -> Option<String> {
    loop {
        let password = prompt(rl, "password (1..16 chars, 'q' to cancel): ")?;
        if password.is_empty() || password.len() > 16 {
            println!("Password must be 1-16 characters.");
            continue;
        }
        let confirm = prompt(rl, "confirm password: ")?;
        if password != confirm {
            println!("Passwords do not match. Try again.");
            continue;
        }
        return Some(password);
    }
}

fn print_error(op: &str, err: &ClientError) {
    match err {
        ClientError::NoReply { .. } => println!(
            "{}: no reply from server (packet loss, wrong port, server down, or firewall)",
            format!("{} failed", op).red()
        ),
        _ => println!("{}: {}", format!("{} failed", op).red(), err),
    }
}

async fn handle_open(rl: &mut Repl, client: &mut Client) {
    println!("=== OPEN account ('q' at any prompt cancels) ===");

    let Some(name) = prompt_nonempty(rl, "name: ") else {
        return;
    };
    let Some(password) = prompt_new_password(rl) else {
        return;
    };
    let Some(currency) = prompt_currency(rl) else {
        return;
    };
    let Some(initial) = prompt_f64(rl, "initial balance: ") else {
        return;
    };
    if initial < 0.0 {
        println!("Balance cannot be negative.");
        return;
    }

    match client.open(&name, &password, currency, initial).await {
        Ok(receipt) => println!(
            "{} accountNo={} balance={}",
            "OPEN OK.".green(),
            receipt.account_no.to_string().cyan(),
            receipt.balance
        ),
        Err(e) => print_error("OPEN", &e),
    }
}

async fn handle_close(rl: &mut Repl, client: &mut Client) {
    println!("=== CLOSE account ('q' at any prompt cancels) ===");

    let Some(name) = prompt_nonempty(rl, "name: ") else {
        return;
    };
    let Some(account) = prompt_account(rl, "accountNo: ") else {
        return;
    };
    let Some(password) = prompt_password(rl) else {
        return;
    };

    match client.close(&name, account, &password).await {
        Ok(message) => println!("{} {}", "CLOSE OK:".green(), message),
        Err(e) => print_error("CLOSE", &e),
    }
}

async fn handle_deposit(rl: &mut Repl, client: &mut Client) {
    println!("=== DEPOSIT ('q' at any prompt cancels) ===");

    let Some(name) = prompt_nonempty(rl, "name: ") else {
        return;
    };
    let Some(account) = prompt_account(rl, "accountNo: ") else {
        return;
    };
    let Some(password) = prompt_password(rl) else {
        return;
    };
    let Some(currency) = prompt_currency(rl) else {
        return;
    };
    let Some(amount) = prompt_amount(rl) else {
        return;
    };

    match client
        .deposit(&name, account, &password, currency, amount)
        .await
    {
        Ok(balance) => {
            println!("Password & account verified. Hello, {}!", name);
            println!("{} new balance={}", "DEPOSIT OK.".green(), balance);
        }
        Err(e) => print_error("DEPOSIT", &e),
    }
}

async fn handle_withdraw(rl: &mut Repl, client: &mut Client) {
    println!("=== WITHDRAW ('q' at any prompt cancels) ===");

    let Some(name) = prompt_nonempty(rl, "name: ") else {
        return;
    };
    let Some(account) = prompt_account(rl, "accountNo: ") else {
        return;
    };
    let Some(password) = prompt_password(rl) else {
        return;
    };
    let Some(currency) = prompt_currency(rl) else {
        return;
    };
    let Some(amount) = prompt_amount(rl) else {
        return;
    };

    match client
        .withdraw(&name, account, &password, currency, amount)
        .await
    {
        Ok(balance) => {
            println!("Password & account verified. Hello, {}!", name);
            println!("{} new balance={}", "WITHDRAW OK.".green(), balance);
        }
        Err(e) => print_error("WITHDRAW", &e),
    }
}

async fn handle_query(rl: &mut Repl, client: &mut Client) {
    println!("=== QUERY balance ('q' at any prompt cancels) ===");

    let Some(name) = prompt_nonempty(rl, "name: ") else {
        return;
    };
    let Some(account) = prompt_account(rl, "accountNo: ") else {
        return;
    };
    let Some(password) = prompt_password(rl) else {
        return;
    };

    match client.query_balance(&name, account, &password).await {
        Ok(receipt) => {
            println!("Password & account verified. Hello, {}!", name);
            println!(
                "{} {} {}",
                "BALANCE:".green(),
                receipt.balance,
                receipt.currency
            );
        }
        Err(e) => print_error("QUERY", &e),
    }
}

async fn handle_transfer(rl: &mut Repl, client: &mut Client) {
    println!("=== TRANSFER ('q' at any prompt cancels) ===");

    let Some(name) = prompt_nonempty(rl, "name (owner of FROM account): ") else {
        return;
    };
    let Some(from) = prompt_account(rl, "fromAccountNo: ") else {
        return;
    };
    let Some(password) = prompt_password(rl) else {
        return;
    };
    let Some(to) = prompt_account(rl, "toAccountNo: ") else {
        return;
    };
    if from == to {
        println!("Cannot transfer to the same account.");
        return;
    }
    let Some(currency) = prompt_currency(rl) else {
        return;
    };
    let Some(amount) = prompt_amount(rl) else {
        return;
    };

    match client
        .transfer(&name, from, &password, to, currency, amount)
        .await
    {
        Ok(receipt) => {
            println!("Password & account verified. Hello, {}!", name);
            println!(
                "{} fromNewBal={} toNewBal={}",
                "TRANSFER OK.".green(),
                receipt.from_balance,
                receipt.to_balance
            );
        }
        Err(e) => print_error("TRANSFER", &e),
    }
}

async fn handle_monitor(rl: &mut Repl, client: &mut Client) {
    println!("=== MONITOR ('q' to cancel) ===");

    let Some(seconds) = prompt_u16(rl, "monitor seconds: ") else {
        return;
    };
    if seconds == 0 {
        println!("Seconds must be positive.");
        return;
    }

    match client.monitor_register(seconds).await {
        Ok(message) => {
            println!("{} {}", "MONITOR OK:".green(), message);
            println!(
                "== Waiting callbacks for {} seconds (client blocked) ==",
                seconds
            );

            if let Err(e) = client
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
                .await
            {
                print_error("MONITOR", &e);
            }

            println!("== Monitor finished ==");
        }
        Err(e) => print_error("MONITOR", &e),
    }
}
