// =====================================================================================
// File: core-observability/src/metrics.rs
// Description: Prometheus business metrics for the triage pipeline
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use crate::ObservabilityError;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};


/// Business metrics for the Rapid100 triage pipeline
pub struct TriageMetrics {
    registry: Registry,

    // Call volume
    pub calls_processed: IntCounterVec,
    pub calls_escalated: IntCounter,
    pub calls_reprompted: IntCounter,
    pub degraded_outcomes: IntCounter,

    // Downstream fan-out
    pub persistence_failures: IntCounter,
    pub broadcast_drops: IntCounter,
    pub live_subscribers: IntGauge,

    // Latency
    pub processing_seconds: Histogram,
}

impl TriageMetrics {
    pub fn new() -> Result<Self, ObservabilityError> {
        let registry = Registry::new();

        let calls_processed = IntCounterVec::new(
            Opts::new("rapid100_calls_processed_total", "Triaged utterances by emergency type"),
            &["emergency_type"],
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let calls_escalated = IntCounter::new(
            "rapid100_calls_escalated_total",
            "Sessions escalated to critical on follow-up",
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let calls_reprompted = IntCounter::new(
            "rapid100_calls_reprompted_total",
            "First turns re-prompted for too-short utterances",
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let degraded_outcomes = IntCounter::new(
            "rapid100_degraded_outcomes_total",
            "Backend failures answered with the degraded sentinel",
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let persistence_failures = IntCounter::new(
            "rapid100_persistence_failures_total",
            "Call-record writes dropped after exhausting retries",
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let broadcast_drops = IntCounter::new(
            "rapid100_broadcast_drops_total",
            "Live events dropped for lack of subscribers or saturation",
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let live_subscribers = IntGauge::new(
            "rapid100_live_subscribers",
            "Currently connected operator socket clients",
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        let processing_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "rapid100_processing_seconds",
                "End-to-end triage latency per utterance",
            )
            .buckets(vec![0.001, 0.005, 0.025, 0.1, 0.5, 1.0, 2.0, 4.0]),
        )
        .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        registry
            .register(Box::new(calls_processed.clone()))
            .and_then(|_| registry.register(Box::new(calls_escalated.clone())))
            .and_then(|_| registry.register(Box::new(calls_reprompted.clone())))
            .and_then(|_| registry.register(Box::new(degraded_outcomes.clone())))
            .and_then(|_| registry.register(Box::new(persistence_failures.clone())))
            .and_then(|_| registry.register(Box::new(broadcast_drops.clone())))
            .and_then(|_| registry.register(Box::new(live_subscribers.clone())))
            .and_then(|_| registry.register(Box::new(processing_seconds.clone())))
            .map_err(|e| ObservabilityError::Metrics(e.to_string()))?;

        Ok(Self {
            registry,
            calls_processed,
            calls_escalated,
            calls_reprompted,
            degraded_outcomes,
            persistence_failures,
            broadcast_drops,
            live_subscribers,
            processing_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, ObservabilityError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| ObservabilityError::Metrics(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| ObservabilityError::Metrics(format!("Metrics are not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_render() {
        let metrics = TriageMetrics::new().unwrap();
        metrics.calls_processed.with_label_values(&["FIRE"]).inc();
        metrics.calls_escalated.inc();
        metrics.processing_seconds.observe(0.012);

        let text = metrics.gather().unwrap();
        assert!(text.contains("rapid100_calls_processed_total"));
        assert!(text.contains("rapid100_calls_escalated_total"));
    }
}
