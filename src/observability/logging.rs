//! # Structured Logging
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` (honouring `RUST_LOG`, falling
//! back to the configured level) and a fmt layer that writes JSON or plain text.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::{LogConfig, LogFormat};
use crate::core::error::{GatewayError, GatewayResult};

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(config: &LogConfig) -> String {
    format!("food_gateway={level},tower_http={level}", level = config.level)
}

/// Initialize the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> GatewayResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| GatewayError::internal(format!("Failed to initialize logging: {}", e)))
}
