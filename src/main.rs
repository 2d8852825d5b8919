//! # VerifyGlobal Proxy Entry Point
//!
//! Runs the internal Salt Edge proxy until Ctrl-C.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use verifyglobal::{config::ConfigLoader, server::run_server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        info!(configuration = %redacted_json, "Effective configuration");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    run_server(config, shutdown).await
}
