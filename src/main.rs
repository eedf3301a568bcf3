//! # Food Gateway - Main Entry Point
//!
//! Loads configuration (defaults, optional YAML file, environment overrides), sets up
//! logging, and serves the gateway until SIGINT or SIGTERM.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use food_gateway::observability::init_logging;
use food_gateway::{GatewayConfig, GatewayResult, GatewayServer};

#[tokio::main]
async fn main() -> GatewayResult<()> {
    let config = match GatewayConfig::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load gateway configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging)?;

    info!("🚀 Starting Food Gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    for entry in &config.services {
        info!(service = %entry.name, url = %entry.base_address, "Registered service");
    }

    let server = match GatewayServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to build gateway: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    if let Err(e) = server.serve(shutdown).await {
        error!("Gateway terminated with error: {}", e);
        std::process::exit(1);
    }

    info!("✅ Food Gateway shutdown complete");
    Ok(())
}

/// Cancel `token` on the first SIGINT or SIGTERM
async fn wait_for_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("📡 Received SIGINT, initiating graceful shutdown..."),
        _ = terminate => info!("📡 Received SIGTERM, initiating graceful shutdown..."),
    }

    token.cancel();
}
