// =====================================================================================
// File: core-triage/src/engine.rs
// Description: Triage orchestrator - backend selection, routing, response synthesis
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use chrono::Utc;
use core_ai::OllamaClient;
use core_config::{BackendKind, TriageConfig};
use core_model::{Classification, SeverityThresholds, TriageResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::backend::{ClassifierBackend, LlmBackend};
use crate::error::{EngineResult, TriageError};
use crate::location::extract_location;
use crate::response::synthesize;
use crate::routing::route;
use crate::rule::RuleClassifier;
use crate::summary;

/// Orchestrates one utterance through classification, severity, routing,
/// and response synthesis. Stateless per call; clones are cheap and every
/// call progresses independently.
pub struct TriageEngine {
    backend: BackendKind,
    min_confidence: f32,
    thresholds: SeverityThresholds,
    rule: RuleClassifier,
    llm: Option<LlmBackend>,
}

impl TriageEngine {
    pub fn new(
        config: &TriageConfig,
        llm_client: Option<Arc<OllamaClient>>,
        llm_deadline_ms: u64,
    ) -> EngineResult<Self> {
        let thresholds = SeverityThresholds {
            critical: config.severity_critical,
            high: config.severity_high,
            moderate: config.severity_moderate,
        };

        let llm = llm_client.map(|client| LlmBackend::new(client, llm_deadline_ms));
        if matches!(config.backend, BackendKind::Llm | BackendKind::Hybrid) && llm.is_none() {
            return Err(TriageError::BackendUnavailable(format!(
                "backend '{:?}' requires a model client",
                config.backend
            )));
        }

        Ok(Self {
            backend: config.backend,
            min_confidence: config.min_confidence,
            thresholds,
            rule: RuleClassifier::new(thresholds),
            llm,
        })
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    /// Process one transcript into a complete outcome. Never fails: backend
    /// trouble degrades to a safe over-dispatching result.
    #[instrument(skip(self, transcript), fields(backend = ?self.backend))]
    pub async fn process(&self, transcript: &str) -> TriageResult {
        let started = Instant::now();

        let classification = self.classify(transcript).await;

        // Routing table fills service and priority; the backend's own
        // suggestion wins above the confidence gate, and the degraded
        // sentinel always keeps its over-dispatching values.
        let (table_service, table_priority) =
            route(classification.emergency_type, classification.severity_level);
        let trusted =
            classification.confidence >= self.min_confidence || classification.is_degraded();
        let assigned_service = classification
            .suggested_service
            .filter(|_| trusted)
            .unwrap_or(table_service);
        let priority = classification
            .suggested_priority
            .filter(|_| trusted)
            .unwrap_or(table_priority);

        let safety = synthesize(classification.emergency_type, classification.severity_level);

        let location = classification
            .location
            .clone()
            .or_else(|| extract_location(transcript));

        let summary_text = match classification.summary.clone() {
            Some(text) => summary::truncate(text),
            None => summary::generate(
                classification.emergency_type,
                classification.severity_level,
                &classification.risk_indicators,
                location.as_deref(),
            ),
        };

        let mut outcome = TriageResult {
            transcript: transcript.to_string(),
            emergency_type: classification.emergency_type,
            severity_level: classification.severity_level,
            severity_score: classification.severity_score,
            risk_indicators: classification.risk_indicators,
            assigned_service,
            priority,
            location,
            summary: summary_text,
            confidence: classification.confidence,
            spoken: safety.spoken,
            immediate_actions: safety.immediate_actions,
            precautions: safety.precautions,
            danger_question: safety.danger_question,
            escalated_spoken: safety.escalated_spoken,
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            created_at: Utc::now(),
        };
        outcome.enforce_invariants(&self.thresholds);

        debug!(
            kind = outcome.emergency_type.as_str(),
            severity = outcome.severity_level.as_str(),
            service = outcome.assigned_service.as_str(),
            priority = outcome.priority,
            elapsed_ms = outcome.processing_time_ms,
            "Triage complete"
        );

        outcome
    }

    /// Model output is untrusted: the level it names must agree with the
    /// score it names, so the score wins.
    fn rebucket(&self, mut classification: Classification) -> Classification {
        classification.severity_level =
            core_model::SeverityLevel::from_score(classification.severity_score, &self.thresholds);
        classification
    }

    async fn classify(&self, transcript: &str) -> Classification {
        match self.backend {
            BackendKind::Rule => self.rule.classify(transcript),
            BackendKind::Llm => {
                let llm = self.llm.as_ref().expect("llm backend checked at construction");
                match llm.classify(transcript).await {
                    Ok(classification) => self.rebucket(classification),
                    Err(e) => {
                        warn!(error = %e, "Model backend failed, returning degraded outcome");
                        Classification::degraded()
                    }
                }
            }
            BackendKind::Hybrid => {
                let llm = self.llm.as_ref().expect("llm backend checked at construction");
                match llm.classify(transcript).await {
                    Ok(classification) if classification.confidence >= self.min_confidence => {
                        self.rebucket(classification)
                    }
                    Ok(classification) => {
                        debug!(
                            confidence = classification.confidence,
                            "Model confidence below gate, using rule classifier"
                        );
                        self.rule.classify(transcript)
                    }
                    Err(e) => {
                        warn!(error = %e, "Model backend failed, using rule classifier");
                        self.rule.classify(transcript)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{EmergencyService, EmergencyType, SeverityLevel};

    fn rule_engine() -> TriageEngine {
        let config = TriageConfig {
            backend: BackendKind::Rule,
            min_confidence: 0.7,
            severity_critical: 80.0,
            severity_high: 60.0,
            severity_moderate: 40.0,
        };
        TriageEngine::new(&config, None, 3_000).unwrap()
    }

    fn engine_with_dead_llm(backend: BackendKind) -> TriageEngine {
        let config = TriageConfig {
            backend,
            min_confidence: 0.7,
            severity_critical: 80.0,
            severity_high: 60.0,
            severity_moderate: 40.0,
        };
        // Nothing listens on this port; the call fails fast
        let client = Arc::new(OllamaClient::new("http://127.0.0.1:9", "test-model", 0.1, 200).unwrap());
        TriageEngine::new(&config, Some(client), 200).unwrap()
    }

    #[tokio::test]
    async fn test_fire_critical_end_to_end() {
        let outcome = rule_engine()
            .process("There's a massive fire in the apartment building! People are trapped.")
            .await;
        assert_eq!(outcome.emergency_type, EmergencyType::Fire);
        assert_eq!(outcome.severity_level, SeverityLevel::Level1);
        assert_eq!(outcome.assigned_service, EmergencyService::FireDepartment);
        assert!(outcome.priority <= 2);
        assert!(outcome.spoken.starts_with("Help is coming"));
        assert!(!outcome.danger_question.is_empty());
    }

    #[tokio::test]
    async fn test_medical_end_to_end() {
        let outcome = rule_engine()
            .process("My husband is having severe chest pain and collapsed.")
            .await;
        assert_eq!(outcome.emergency_type, EmergencyType::Medical);
        assert!(matches!(
            outcome.severity_level,
            SeverityLevel::Level1 | SeverityLevel::Level2
        ));
        assert_eq!(outcome.assigned_service, EmergencyService::Ambulance);
        assert!(outcome
            .immediate_actions
            .contains(&"Check breathing and pulse".to_string()));
    }

    #[tokio::test]
    async fn test_accident_routes_to_multiple_services() {
        let outcome = rule_engine()
            .process("Multi-car crash on the highway, people trapped.")
            .await;
        assert_eq!(outcome.emergency_type, EmergencyType::Accident);
        assert_eq!(outcome.assigned_service, EmergencyService::MultipleServices);
        assert!(outcome.priority <= 2);
        assert_eq!(outcome.location.as_deref(), Some("highway"));
    }

    #[tokio::test]
    async fn test_llm_failure_returns_degraded_sentinel() {
        let outcome = engine_with_dead_llm(BackendKind::Llm)
            .process("the warehouse is on fire")
            .await;
        assert_eq!(outcome.emergency_type, EmergencyType::Medical);
        assert_eq!(outcome.severity_level, SeverityLevel::Level2);
        assert_eq!(outcome.severity_score, 60.0);
        assert_eq!(outcome.assigned_service, EmergencyService::Ambulance);
        assert_eq!(outcome.priority, 8);
        assert_eq!(outcome.confidence, 0.3);
        assert!(outcome.risk_indicators.contains(&"system_error".to_string()));
    }

    #[tokio::test]
    async fn test_hybrid_falls_back_to_rules() {
        let outcome = engine_with_dead_llm(BackendKind::Hybrid)
            .process("There's a massive fire in the apartment building!")
            .await;
        // Rule fallback, not the sentinel
        assert_eq!(outcome.emergency_type, EmergencyType::Fire);
        assert_eq!(outcome.assigned_service, EmergencyService::FireDepartment);
    }

    #[tokio::test]
    async fn test_severity_always_buckets_score() {
        let engine = rule_engine();
        for transcript in [
            "help",
            "small cut on my finger",
            "he is not breathing at all",
            "there was a robbery yesterday",
        ] {
            let outcome = engine.process(transcript).await;
            assert!(outcome
                .severity_level
                .is_consistent(outcome.severity_score, engine.thresholds()));
            assert!((1..=10).contains(&outcome.priority));
        }
    }

    #[test]
    fn test_llm_backend_requires_client() {
        let config = TriageConfig {
            backend: BackendKind::Llm,
            min_confidence: 0.7,
            severity_critical: 80.0,
            severity_high: 60.0,
            severity_moderate: 40.0,
        };
        assert!(matches!(
            TriageEngine::new(&config, None, 3_000),
            Err(TriageError::BackendUnavailable(_))
        ));
    }
}
