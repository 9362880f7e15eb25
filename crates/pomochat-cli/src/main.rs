//! pomochat terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Chat with bob on the local endpoint
//! pomochat --user alice --peer bob
//!
//! # Another endpoint, verbose logs on stderr
//! pomochat --endpoint ws://chat.example:8000/chat --user alice --log-level debug
//! ```

use std::time::Duration;

use clap::Parser;
use pomochat_app::{Runtime, RuntimeConfig, SessionConfig};
use pomochat_cli::AppConfig;
use pomochat_client::{SystemEnv, transport::WsTransport};
use pomochat_core::config::DEFAULT_ENDPOINT;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// pomochat terminal client
#[derive(Parser, Debug)]
#[command(name = "pomochat")]
#[command(about = "Two-party real-time chat over WebSocket")]
#[command(version)]
struct Args {
    /// Chat endpoint (ws:// or wss://)
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Your user id
    #[arg(short, long)]
    user: String,

    /// User id to open a conversation with on startup
    #[arg(short, long)]
    peer: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Seconds an error stays on screen before it is cleared
    #[arg(long, default_value = "5")]
    error_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let session_config = SessionConfig::new(&args.endpoint)?;
    tracing::info!(endpoint = %session_config.endpoint(), user = %args.user, "pomochat starting");

    let (runtime, handle) =
        Runtime::new(WsTransport, SystemEnv, session_config, RuntimeConfig::default());
    let runtime = tokio::spawn(runtime.run());

    let config = AppConfig {
        user: args.user,
        peer: args.peer,
        error_ttl: Duration::from_secs(args.error_ttl_secs),
    };
    pomochat_cli::run(handle, config, BufReader::new(tokio::io::stdin()), std::io::stdout())
        .await?;

    runtime.await?;
    Ok(())
}
