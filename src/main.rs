use log::{error, info};
use std::time::Duration;
use tokio::sync::broadcast;

use solis_gateway::prelude::{ConfigWrapper, Options, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    let config = ConfigWrapper::new(options.config_file.clone()).unwrap_or_else(|err| {
        eprintln!("Failed to load config: {:?}", err);
        std::process::exit(255);
    });

    solis_gateway::init_logging(&config.loglevel());
    info!("Using config file: {}", options.config_file);

    // Create a channel for shutdown signaling
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        if let Err(e) = shutdown_tx_clone.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    });

    if let Some(runtime) = options.runtime {
        info!("Will stop after {}s", runtime);
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(runtime)).await;
            let _ = shutdown_tx_clone.send(());
        });
    }

    // Run the application
    let app_handle = tokio::spawn(solis_gateway::app(shutdown_rx, config));

    // Wait for the application to complete
    if let Err(e) = app_handle.await? {
        error!("Application error: {:#}", e);
    }

    Ok(())
}
