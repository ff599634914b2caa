// Module declarations for the gateway's core components
pub mod config;    // Configuration management
pub mod error;     // Typed errors for the frame codec and forwarder
pub mod options;   // Command line options parsing
pub mod prelude;   // Common imports and types
pub mod registry;  // Per-inverter bookkeeping of decoded readings
pub mod server;    // Listener lifecycle
pub mod sink;      // Telemetry callback boundary
pub mod solis;     // Solis/Ginlong datalogger protocol implementation
pub mod unixtime;  // Unix timestamp handling
pub mod utils;     // Utility functions

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::registry::InverterRegistry;
use crate::server::Server;
use std::io::Write;
use std::sync::Arc;

/// Initializes env_logger with the given default filter.
///
/// `RUST_LOG` still takes precedence when set.
pub fn init_logging(loglevel: &str) {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(loglevel))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

/// Main application entry point
///
/// Starts the gateway with an [`InverterRegistry`] as telemetry consumer and
/// runs until a shutdown signal arrives, then drains open sessions.
pub async fn app(
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ConfigWrapper,
) -> Result<()> {
    info!("solis-gateway {} starting", CARGO_PKG_VERSION);
    config.log_summary();

    let registry = InverterRegistry::new();
    let server = Server::new(config.gateway(), Arc::new(registry.clone()));

    server.start().await?;

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping server...");
    server.stop().await;

    registry.print_summary();
    info!("Application shutdown complete");

    Ok(())
}
