// server/src/main.rs

// Entry point of the lab booking server: loads configuration, opens storage
// and serves the REST API until ctrl-c.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lib::config::LabConfig;
use lib::notifications::notifier_from_config;
use lib::storage_engine::open_storage;
use rest_api::{start_server, AppState};

use crate::cli::CliArgs;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let mut config = LabConfig::load(args.config.as_deref())?;
    args.apply(&mut config)?;

    let storage = open_storage(&config.storage).context("Failed to open storage")?;
    info!(engine = %storage.get_type(), "Storage ready");
    let notifier = notifier_from_config(&config.notifications)?;
    let state = AppState::new(storage.clone(), notifier, &config);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let served = start_server(&config, state, shutdown_rx).await;
    if let Err(e) = storage.flush().await {
        error!("Failed to flush storage: {}", e);
    }
    served
}
