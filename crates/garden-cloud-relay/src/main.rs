//! garden-cloud-relay - stream Garden events to Garden Cloud
//!
//! - `relay`: read JSON-lines events from stdin and stream them to an
//!   ingestion endpoint, reporting the session as cancelled on Ctrl-C
//! - `mock-ingest`: serve a local ingestion endpoint that acknowledges
//!   every event

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use garden_cloud_relay::{mock, relay, MockIngestService, RelayConfig};
use garden_events::CleanupHooks;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Garden Cloud relay CLI
#[derive(Parser)]
#[command(name = "garden-cloud-relay")]
#[command(about = "Stream Garden events to Garden Cloud", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GARDEN_CLOUD_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "GARDEN_CLOUD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read JSON-lines events from stdin and stream them
    Relay {
        /// Ingestion endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Bearer token for the ingestion endpoint
        #[arg(long, env = "GARDEN_CLOUD_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,

        /// Process session id (random when omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// Upper bound on waiting for acknowledgements at exit
        #[arg(long)]
        drain_timeout_ms: Option<u64>,
    },

    /// Serve a local ingestion endpoint that acknowledges every event
    MockIngest {
        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:50061")]
        listen: SocketAddr,
    },
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    // stdout is left alone for the events being piped through.
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        RelayConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    init_tracing(&config.logging.level, config.logging.json);

    match cli.command {
        Command::Relay {
            endpoint,
            auth_token,
            session_id,
            drain_timeout_ms,
        } => {
            if let Some(endpoint) = endpoint {
                config.cloud.endpoint = endpoint;
            }
            if auth_token.is_some() {
                config.cloud.auth_token = auth_token;
            }
            if let Some(ms) = drain_timeout_ms {
                config.stream.drain_timeout_ms = ms;
            }
            let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let stdin = BufReader::new(tokio::io::stdin());
            let summary = relay::run(
                stdin,
                config,
                session_id,
                CleanupHooks::wait_for_interrupt(),
            )
            .await?;

            if summary.unacknowledged > 0 {
                info!(
                    unacknowledged = summary.unacknowledged,
                    "Some events were not confirmed by Garden Cloud"
                );
            }
        }
        Command::MockIngest { listen } => {
            let listener = tokio::net::TcpListener::bind(listen)
                .await
                .with_context(|| format!("failed to bind {}", listen))?;
            mock::serve(
                listener,
                MockIngestService::new(),
                CleanupHooks::wait_for_interrupt(),
            )
            .await?;
            info!("Mock ingestion endpoint shut down");
        }
    }

    Ok(())
}
