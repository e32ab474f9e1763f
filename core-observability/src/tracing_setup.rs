// =====================================================================================
// File: core-observability/src/tracing_setup.rs
// Description: Tracing subscriber setup for Rapid100 services
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use crate::ObservabilityError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level; console output carries
/// target and level so operator logs stay greppable.
pub fn init_tracing(service_name: &str, level: &str) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| ObservabilityError::Tracing(format!("Failed to init tracing: {}", e)))?;

    tracing::info!(service = %service_name, level = %level, "Tracing initialized");
    Ok(())
}
