//! echo-wire: a minimal TCP echo server and one-shot client
//!
//! Two roles in one binary:
//! - `echo-wire serve` runs a server that accepts one connection at a
//!   time and echoes bytes back verbatim until the peer disconnects.
//! - `echo-wire send` connects, sends one message, prints the echoed
//!   reply, and exits.
//!
//! Configuration comes from CLI arguments or a TOML file; CLI wins.

mod client;
mod config;
mod server;

use client::Client;
use config::{Config, Mode};
use server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Both sides are single-threaded and fully sequential
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match config.mode {
        Mode::Serve => runtime.block_on(run_server(config)),
        Mode::Send => runtime.block_on(run_client(config)),
    }
}

/// Run the echo server until interrupted
async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.host,
        port = config.port,
        backlog = config.backlog,
        "Starting echo server"
    );

    let server = Server::new(config);
    if let Err(e) = server.run().await {
        // Bind/listen failures are fatal
        error!(error = %e, "Socket setup failed");
        std::process::exit(1);
    }
    Ok(())
}

/// Run one client send/receive cycle
async fn run_client(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = Client::new(config.host.clone(), config.port);
    if let Some(reply) = client.run(&config.message).await {
        println!("{reply}");
    }
    // Exit status is 0 regardless of outcome; failures were logged
    Ok(())
}
