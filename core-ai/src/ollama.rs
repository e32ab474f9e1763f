// =====================================================================================
// File: core-ai/src/ollama.rs
// Description: Ollama API integration for triage classification
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use core_model::Classification;

use crate::models::{ChatMessage, OllamaChatRequest, OllamaChatResponse, OllamaOptions, TriageReply};

/// Ollama API errors
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Model host not configured")]
    HostMissing,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),
    #[error("Deadline of {0}ms exceeded")]
    DeadlineExceeded(u64),
}

/// Client for a local Ollama model service
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    deadline_ms: u64,
}

impl OllamaClient {
    /// Create a new client with a hard per-call deadline
    pub fn new(
        base_url: &str,
        model: &str,
        temperature: f32,
        deadline_ms: u64,
    ) -> Result<Self, OllamaError> {
        if base_url.is_empty() {
            return Err(OllamaError::HostMissing);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(deadline_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            deadline_ms,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Health check - verify the model service answers
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), OllamaError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| self.map_timeout(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(OllamaError::Api { status, message })
        }
    }

    /// Issue a throwaway generation so the model is resident before the
    /// first real call. Failures only log; triage falls back regardless.
    #[instrument(skip(self))]
    pub async fn warmup(&self) {
        info!(model = %self.model, "Warming up model");
        match self.chat("Reply with {\"ok\": true}").await {
            Ok(_) => info!(model = %self.model, "Model warm"),
            Err(e) => warn!(model = %self.model, error = %e, "Model warmup failed"),
        }
    }

    /// Run the full triage analysis for one transcript.
    ///
    /// The reply must be a single JSON object; a malformed reply is retried
    /// once before the error surfaces to the caller.
    #[instrument(skip(self, transcript))]
    pub async fn classify_transcript(
        &self,
        transcript: &str,
    ) -> Result<Classification, OllamaError> {
        let prompt = build_triage_prompt(transcript);

        let mut last_error: Option<OllamaError> = None;
        for attempt in 0..2 {
            if attempt > 0 {
                debug!("Retrying after malformed model reply");
            }
            let content = self.chat(&prompt).await?;
            match parse_triage_reply(&content) {
                Ok(reply) => {
                    let classification = reply.into_classification();
                    debug!(
                        kind = classification.emergency_type.as_str(),
                        score = classification.severity_score,
                        confidence = classification.confidence,
                        "Model classification complete"
                    );
                    return Ok(classification);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Model reply was not a valid triage object");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| OllamaError::MalformedReply("empty reply".to_string())))
    }

    /// One chat round against the model, JSON output format enforced
    async fn chat(&self, prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            stream: false,
            format: "json".to_string(),
            options: OllamaOptions {
                temperature: self.temperature,
                ..OllamaOptions::default()
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_timeout(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OllamaChatResponse = response.json().await.map_err(|e| self.map_timeout(e))?;
        Ok(body.message.content)
    }

    fn map_timeout(&self, error: reqwest::Error) -> OllamaError {
        if error.is_timeout() {
            OllamaError::DeadlineExceeded(self.deadline_ms)
        } else {
            OllamaError::Http(error)
        }
    }
}

/// Compact prompt; every extra token costs latency on a small local model
fn build_triage_prompt(transcript: &str) -> String {
    format!(
        r#"Analyze the emergency call and output JSON:

"{transcript}"

TYPES: MEDICAL,FIRE,POLICE,ACCIDENT,MENTAL_HEALTH,OTHER
SEVERITY: LEVEL_1(80-100),LEVEL_2(60-79),LEVEL_3(40-59),LEVEL_4(0-39)
SERVICES: AMBULANCE,FIRE_DEPARTMENT,POLICE,CRISIS_RESPONSE,MULTIPLE_SERVICES

JSON:
{{
  "emergency_type": "type",
  "severity_level": "level",
  "severity_score": 0-100,
  "confidence": 0.0-1.0,
  "assigned_service": "service",
  "priority": 1-10,
  "summary": "brief summary",
  "risk_indicators": ["phrase"],
  "location": "place or null"
}}"#
    )
}

/// Accept only a single JSON object
fn parse_triage_reply(content: &str) -> Result<TriageReply, OllamaError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| OllamaError::MalformedReply(e.to_string()))?;
    if !value.is_object() {
        return Err(OllamaError::MalformedReply(format!(
            "expected a JSON object, got {}",
            value
        )));
    }
    serde_json::from_value(value).map_err(|e| OllamaError::MalformedReply(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{EmergencyType, SeverityLevel};

    #[test]
    fn test_prompt_names_every_canonical_value() {
        let prompt = build_triage_prompt("house on fire");
        assert!(prompt.contains("house on fire"));
        assert!(prompt.contains("MENTAL_HEALTH"));
        assert!(prompt.contains("MULTIPLE_SERVICES"));
        assert!(prompt.contains("LEVEL_1(80-100)"));
    }

    #[test]
    fn test_parse_accepts_single_object() {
        let reply = parse_triage_reply(
            r#"{"emergency_type": "FIRE", "severity_level": "LEVEL_2", "severity_score": 70}"#,
        )
        .unwrap();
        let classification = reply.into_classification();
        assert_eq!(classification.emergency_type, EmergencyType::Fire);
        assert_eq!(classification.severity_level, SeverityLevel::Level2);
    }

    #[test]
    fn test_parse_rejects_non_object_replies() {
        assert!(parse_triage_reply("[1, 2, 3]").is_err());
        assert!(parse_triage_reply("\"just a string\"").is_err());
        assert!(parse_triage_reply("the building is on fire").is_err());
        assert!(parse_triage_reply("").is_err());
    }

    #[test]
    fn test_empty_host_is_rejected() {
        assert!(matches!(
            OllamaClient::new("", "qwen2.5:0.5b", 0.1, 3000),
            Err(OllamaError::HostMissing)
        ));
    }
}
