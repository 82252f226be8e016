use anyhow::Context;
use arb_desk_core::{AppConfig, StateStore};
use arb_desk_upstream::{UpstreamClient, UpstreamConfig};
use arb_desk_web_api::{ApiServer, AppState};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "arb-desk")]
#[command(about = "Dashboard proxy for a Kalshi-style prediction-market API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Bind address; overrides host/PORT from the environment
        #[arg(short, long)]
        addr: Option<String>,
        /// Path of the state snapshot file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    /// Print the persisted state snapshot and exit
    ShowState {
        /// Path of the state snapshot file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Serve { addr, state_file } => {
            let addr = addr.unwrap_or_else(|| config.bind_addr());
            let state_file = state_file.unwrap_or_else(|| config.state_file.clone());

            let upstream_config = UpstreamConfig::from_env();
            if !upstream_config.has_credentials() {
                tracing::warn!(
                    "KALSHI_API_KEY / KALSHI_API_SECRET not set; order placement will return 401"
                );
            }

            let state = AppState {
                store: Arc::new(StateStore::load(state_file)),
                upstream: Arc::new(
                    UpstreamClient::new(upstream_config)
                        .context("failed to construct upstream client")?,
                ),
                allowed_categories: Arc::new(config.allowed_categories),
            };

            ApiServer::new(state).serve(&addr).await?;
        }
        Commands::ShowState { state_file } => {
            let state_file = state_file.unwrap_or_else(|| config.state_file.clone());
            let store = StateStore::load(state_file);
            let snapshot = store.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
