//! Parley terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Log in to a local server
//! PARLEY_PASSWORD=secret parley --username alice
//!
//! # Create the account first
//! parley --username alice --password secret --register-email alice@example.com
//! ```
//!
//! Type `/help` once connected.

use std::time::Duration;

use clap::Parser;
use parley_app::Runtime;
use parley_cli::{Account, CliDriver, sign_in};
use parley_client::{
    ClientConfig, DEFAULT_WS_ENDPOINT, SharedCredentials,
    directory::{DEFAULT_BASE_URL, DirectoryClient, DirectoryConfig},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Parley chat terminal client
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Line-oriented terminal client for Parley chat")]
#[command(version)]
struct Args {
    /// Base URL of the REST API
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Websocket endpoint for conversations
    #[arg(long, default_value = DEFAULT_WS_ENDPOINT)]
    ws_endpoint: String,

    /// Account name
    #[arg(short, long)]
    username: String,

    /// Account password
    #[arg(short, long, env = "PARLEY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Register the account with this email before logging in
    #[arg(long)]
    register_email: Option<String>,

    /// Seconds an optimistic member add may stay unconfirmed
    #[arg(long, default_value = "10")]
    membership_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // stdout carries the transcript
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let credentials = SharedCredentials::new();
    let directory =
        DirectoryClient::new(DirectoryConfig { base_url: args.server }, credentials.clone());

    let account = Account {
        username: args.username,
        password: args.password,
        register_email: args.register_email,
    };
    let identity = sign_in(&directory, &credentials, &account).await?;
    tracing::info!(username = %identity.username(), "signed in");

    let config = ClientConfig {
        ws_endpoint: args.ws_endpoint,
        membership_confirmation_timeout: Duration::from_secs(args.membership_timeout_secs),
    };
    let driver = CliDriver::new(directory, identity.username());

    Runtime::new(driver, config, identity, credentials).run().await?;

    Ok(())
}
