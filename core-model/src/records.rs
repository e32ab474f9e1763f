// =====================================================================================
// File: core-model/src/records.rs
// Description: Record shapes produced by the triage pipeline and call lifecycle
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModelError, ModelResult};
use crate::types::{CallStatus, EmergencyService, EmergencyType, SeverityLevel, SeverityThresholds};

/// Clamp a dispatch priority into its contractual [1,10] range
pub fn clamp_priority(priority: i32) -> i32 {
    priority.clamp(1, 10)
}

/// Clamp a classification confidence into [0,1]
pub fn clamp_confidence(confidence: f32) -> f32 {
    confidence.clamp(0.0, 1.0)
}

/// Clamp a severity score into [0,100]
pub fn clamp_score(score: f32) -> f32 {
    score.clamp(0.0, 100.0)
}

/// Partial outcome emitted by a classification backend.
///
/// Both the rule classifier and the model-backed classifier produce this
/// shape; the orchestrator completes it into a [`TriageResult`]. Service and
/// priority are suggestions only, honored above a confidence threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub emergency_type: EmergencyType,
    pub severity_level: SeverityLevel,
    pub severity_score: f32,
    pub confidence: f32,
    pub risk_indicators: Vec<String>,
    pub suggested_service: Option<EmergencyService>,
    pub suggested_priority: Option<i32>,
    pub summary: Option<String>,
    pub location: Option<String>,
}

impl Classification {
    /// Safe sentinel used when a backend fails or times out.
    /// Over-dispatches on purpose: ambulance, high severity, manual review.
    pub fn degraded() -> Self {
        Self {
            emergency_type: EmergencyType::Medical,
            severity_level: SeverityLevel::Level2,
            severity_score: 60.0,
            confidence: 0.3,
            risk_indicators: vec!["system_error".to_string()],
            suggested_service: Some(EmergencyService::Ambulance),
            suggested_priority: Some(8),
            summary: Some("System error - escalating to manual review".to_string()),
            location: None,
        }
    }

    /// Whether this is the degraded sentinel
    pub fn is_degraded(&self) -> bool {
        self.risk_indicators.iter().any(|tag| tag == "system_error")
    }
}

/// Complete outcome of triaging one utterance.
///
/// Produced by the triage engine and handed by value to persistence and
/// broadcast; nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageResult {
    /// Verbatim speech-to-text input
    pub transcript: String,
    pub emergency_type: EmergencyType,
    pub severity_level: SeverityLevel,
    pub severity_score: f32,
    pub risk_indicators: Vec<String>,
    pub assigned_service: EmergencyService,
    pub priority: i32,
    pub location: Option<String>,
    /// Dispatcher-facing summary, at most 200 characters
    pub summary: String,
    pub confidence: f32,
    /// Single flowing sentence spoken back to the caller
    pub spoken: String,
    pub immediate_actions: Vec<String>,
    pub precautions: Vec<String>,
    /// Yes/no risk question for the follow-up turn
    pub danger_question: String,
    /// Spoken confirmation used when the caller escalates
    pub escalated_spoken: String,
    pub processing_time_ms: f64,
    pub created_at: DateTime<Utc>,
}

impl TriageResult {
    /// Validate the contractual invariants of a finished outcome
    pub fn validate(&self, thresholds: &SeverityThresholds) -> ModelResult<()> {
        if self.transcript.trim().is_empty() {
            return Err(ModelError::MissingField { field: "transcript" });
        }
        if !(0.0..=100.0).contains(&self.severity_score) {
            return Err(ModelError::out_of_range(
                "severity_score",
                self.severity_score as f64,
                0.0,
                100.0,
            ));
        }
        if !(1..=10).contains(&self.priority) {
            return Err(ModelError::out_of_range(
                "priority",
                self.priority as f64,
                1.0,
                10.0,
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::out_of_range(
                "confidence",
                self.confidence as f64,
                0.0,
                1.0,
            ));
        }
        if !self.severity_level.is_consistent(self.severity_score, thresholds) {
            return Err(ModelError::inconsistent(format!(
                "severity {} does not bucket score {}",
                self.severity_level.as_str(),
                self.severity_score
            )));
        }
        Ok(())
    }

    /// Production policy for invariant violations: clamp, realign, and log.
    /// Debug builds assert instead so bad pipelines fail in development.
    pub fn enforce_invariants(&mut self, thresholds: &SeverityThresholds) {
        debug_assert!(
            self.validate(thresholds).is_ok(),
            "triage outcome violates invariants: {:?}",
            self.validate(thresholds)
        );

        let clamped_score = clamp_score(self.severity_score);
        if clamped_score != self.severity_score {
            warn!(score = self.severity_score, "Clamping out-of-range severity score");
            self.severity_score = clamped_score;
        }
        let clamped_priority = clamp_priority(self.priority);
        if clamped_priority != self.priority {
            warn!(priority = self.priority, "Clamping out-of-range priority");
            self.priority = clamped_priority;
        }
        self.confidence = clamp_confidence(self.confidence);
        let bucket = SeverityLevel::from_score(self.severity_score, thresholds);
        if bucket != self.severity_level {
            warn!(
                level = self.severity_level.as_str(),
                score = self.severity_score,
                realigned = bucket.as_str(),
                "Severity level inconsistent with score, realigning"
            );
            self.severity_level = bucket;
        }
    }
}

/// Persisted call entity, one row per distinct provider call identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: i64,
    pub call_sid: String,
    pub from_number: String,
    pub to_number: String,
    #[serde(flatten)]
    pub triage: TriageResult,
    pub status: CallStatus,
    pub assigned_unit: Option<String>,
    /// Free-form provider metadata bag
    pub metadata: serde_json::Value,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CallRecord {
    pub fn validate(&self, thresholds: &SeverityThresholds) -> ModelResult<()> {
        if self.call_sid.trim().is_empty() {
            return Err(ModelError::MissingField { field: "call_sid" });
        }
        self.triage.validate(thresholds)
    }
}

/// Operator note attached to a persisted call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallNote {
    pub id: i64,
    pub call_id: i64,
    pub note: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Phase of an in-flight conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationPhase {
    AwaitingFollowup,
    Escalated,
    Completed,
}

/// In-memory, per-call conversation state owned by the session manager.
///
/// Keyed by `call_sid`, evicted on terminal phase or after the inactivity
/// TTL. Never persisted.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub call_sid: String,
    pub emergency_type: EmergencyType,
    pub severity_level: SeverityLevel,
    pub priority: i32,
    pub assigned_service: EmergencyService,
    pub phase: ConversationPhase,
    pub danger_question: String,
    pub escalated_spoken: String,
    /// Danger-question re-asks issued for unclear answers
    pub reasks: u8,
    /// Last processed utterance, kept for duplicate-delivery replay
    pub last_transcript: Option<String>,
    /// Reply spoken for the last processed utterance
    pub last_spoken: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_turn_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn from_outcome(call_sid: &str, outcome: &TriageResult) -> Self {
        let now = Utc::now();
        Self {
            call_sid: call_sid.to_string(),
            emergency_type: outcome.emergency_type,
            severity_level: outcome.severity_level,
            priority: outcome.priority,
            assigned_service: outcome.assigned_service,
            phase: ConversationPhase::AwaitingFollowup,
            danger_question: outcome.danger_question.clone(),
            escalated_spoken: outcome.escalated_spoken.clone(),
            reasks: 0,
            last_transcript: Some(outcome.transcript.clone()),
            last_spoken: Some(outcome.spoken.clone()),
            created_at: now,
            last_turn_at: now,
        }
    }

    /// Monotonic escalation: severity only ever moves toward critical
    pub fn escalate(&mut self) {
        self.severity_level = SeverityLevel::Level1;
        self.priority = 1;
        self.phase = ConversationPhase::Escalated;
    }

    pub fn touch(&mut self) {
        self.last_turn_at = Utc::now();
    }

    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        Utc::now() - self.last_turn_at > Duration::seconds(ttl_seconds)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, ConversationPhase::Completed)
    }
}
