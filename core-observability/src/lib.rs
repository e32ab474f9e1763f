// =====================================================================================
// File: core-observability/src/lib.rs
// Description: Observability utilities for the Rapid100 platform - logging, metrics, health
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::{HealthCheckResult, HealthStatus};
pub use metrics::TriageMetrics;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Observability errors
#[derive(Error, Debug)]
pub enum ObservabilityError {
    #[error("Metrics error: {0}")]
    Metrics(String),
    #[error("Tracing error: {0}")]
    Tracing(String),
    #[error("Health check error: {0}")]
    HealthCheck(String),
}
