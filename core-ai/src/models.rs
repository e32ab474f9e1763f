// =====================================================================================
// File: core-ai/src/models.rs
// Description: Wire types for the Ollama chat API and the triage reply contract
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use core_model::{
    clamp_confidence, clamp_priority, clamp_score, normalize_lossy, Classification,
    EmergencyService, EmergencyType, SeverityLevel,
};
use serde::{Deserialize, Serialize};

/// Chat message in the Ollama wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Generation options tuned for low-latency triage
#[derive(Debug, Clone, Serialize)]
pub struct OllamaOptions {
    pub temperature: f32,
    pub num_ctx: u32,
    pub num_predict: u32,
    pub top_k: u32,
}

impl Default for OllamaOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            num_ctx: 256,
            num_predict: 128,
            top_k: 5,
        }
    }
}

/// Request body for `POST /api/chat`
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    /// "json" constrains the model to emit a single JSON object
    pub format: String,
    pub options: OllamaOptions,
}

/// Response body for `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatResponse {
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
}

/// The JSON object the model is instructed to return.
///
/// Every field is optional on the wire; the conversion below fills safe
/// defaults and clamps ranges so a sloppy model cannot corrupt an outcome.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriageReply {
    pub emergency_type: Option<String>,
    pub severity_level: Option<String>,
    pub severity_score: Option<f32>,
    pub confidence: Option<f32>,
    pub assigned_service: Option<String>,
    pub priority: Option<i32>,
    pub summary: Option<String>,
    #[serde(default)]
    pub risk_indicators: serde_json::Value,
    pub location: Option<String>,
}

impl TriageReply {
    /// Coerce the reply into a [`Classification`], healing unknown enum
    /// strings and clamping every numeric range.
    pub fn into_classification(self) -> Classification {
        let emergency_type = self
            .emergency_type
            .as_deref()
            .map(normalize_lossy::<EmergencyType>)
            .unwrap_or(EmergencyType::Other);

        let severity_level = self
            .severity_level
            .as_deref()
            .map(normalize_lossy::<SeverityLevel>)
            .unwrap_or(SeverityLevel::Level3);

        let suggested_service = self
            .assigned_service
            .as_deref()
            .map(normalize_lossy::<EmergencyService>);

        let risk_indicators = match self.risk_indicators {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            serde_json::Value::String(single) => vec![single],
            _ => Vec::new(),
        };

        // Models occasionally return the literal string "null"
        let location = self
            .location
            .filter(|value| !value.trim().is_empty() && !value.eq_ignore_ascii_case("null"));

        Classification {
            emergency_type,
            severity_level,
            severity_score: clamp_score(self.severity_score.unwrap_or(50.0)),
            confidence: clamp_confidence(self.confidence.unwrap_or(0.7)),
            risk_indicators,
            suggested_service,
            suggested_priority: self.priority.map(clamp_priority),
            summary: self.summary,
            location,
        }
    }
}
