//! teller-cli - Client for the teller UDP banking service
//!
//! Provides both an interactive menu and one-shot command execution.

mod commands;
mod menu;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use teller_client::{Client, ClientConfig, Semantics};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "teller-cli")]
#[command(about = "Client for the teller UDP banking service")]
#[command(version)]
struct Cli {
    /// Server IPv4 address
    #[arg(long, default_value = "127.0.0.1")]
    server: Ipv4Addr,

    /// Server port
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Invocation semantics
    #[arg(long, value_enum, default_value = "atmost")]
    sem: SemanticsArg,

    /// Per-attempt receive timeout in milliseconds
    #[arg(long, default_value_t = 500)]
    timeout: u64,

    /// Send attempts per call
    #[arg(long, default_value_t = 5)]
    retry: u32,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SemanticsArg {
    /// Server deduplicates resends and replays the cached reply
    Atmost,
    /// Server re-executes every resend
    Atleast,
}

impl From<SemanticsArg> for Semantics {
    fn from(arg: SemanticsArg) -> Self {
        match arg {
            SemanticsArg::Atmost => Semantics::AtMostOnce,
            SemanticsArg::Atleast => Semantics::AtLeastOnce,
        }
    }
}

/// Currency argument for one-shot commands.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CurrencyArg {
    Cny,
    Sgd,
}

impl From<CurrencyArg> for teller_protocol::Currency {
    fn from(arg: CurrencyArg) -> Self {
        match arg {
            CurrencyArg::Cny => teller_protocol::Currency::Cny,
            CurrencyArg::Sgd => teller_protocol::Currency::Sgd,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive menu
    Menu,

    /// Open an account
    Open {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, value_enum)]
        currency: CurrencyArg,
        /// Initial balance
        #[arg(short, long, default_value_t = 0.0)]
        initial: f64,
    },

    /// Close an account
    Close {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        account: i32,
        #[arg(short, long)]
        password: String,
    },

    /// Deposit into an account
    Deposit {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        account: i32,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, value_enum)]
        currency: CurrencyArg,
        #[arg(long)]
        amount: f64,
    },

    /// Withdraw from an account
    Withdraw {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        account: i32,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, value_enum)]
        currency: CurrencyArg,
        #[arg(long)]
        amount: f64,
    },

    /// Query an account's balance
    Query {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        account: i32,
        #[arg(short, long)]
        password: String,
    },

    /// Transfer between two accounts
    Transfer {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        from: i32,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        to: i32,
        #[arg(short, long, value_enum)]
        currency: CurrencyArg,
        #[arg(long)]
        amount: f64,
    },

    /// Register for update callbacks and print them as they arrive
    Monitor {
        /// Subscription lifetime in seconds
        seconds: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::new(SocketAddr::from((cli.server, cli.port)))
        .with_semantics(cli.sem.into())
        .with_timeout(Duration::from_millis(cli.timeout))
        .with_retries(cli.retry);

    let mut client = match Client::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}: {}", "Connection setup failed".red(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Menu) | None => menu::run(&mut client).await?,
        Some(cmd) => match commands::execute(&mut client, cmd).await {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
