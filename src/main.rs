//! tellerd - UDP banking server
//!
//! A datagram RPC server with selectable invocation semantics and built-in
//! request/reply loss injection for exercising the retry and deduplication
//! paths.

use clap::Parser;
use std::net::SocketAddr;
use teller_bank::Bank;
use teller_server::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tellerd")]
#[command(about = "UDP banking server with selectable invocation semantics")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Probability in [0,1] of dropping an incoming request
    #[arg(long = "lossReq", default_value_t = 0.0)]
    loss_req: f64,

    /// Probability in [0,1] of dropping an outgoing reply
    #[arg(long = "lossRep", default_value_t = 0.0)]
    loss_rep: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], args.port)))
        .with_loss(args.loss_req, args.loss_rep);

    tracing::info!("starting tellerd");

    let server = match Server::bind(config, Bank::new()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    server.run().await?;
    Ok(())
}
