// =====================================================================================
// File: core-triage/src/backend.rs
// Description: Classification backend seam - rule-based and model-backed implementations
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use async_trait::async_trait;
use core_ai::OllamaClient;
use core_model::Classification;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{EngineResult, TriageError};
use crate::rule::RuleClassifier;

/// Narrow interface both classification backends implement.
///
/// The session state machine never sees which backend ran; both produce the
/// same partial-outcome shape.
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, transcript: &str) -> EngineResult<Classification>;
}

#[async_trait]
impl ClassifierBackend for RuleClassifier {
    fn name(&self) -> &'static str {
        "rule"
    }

    async fn classify(&self, transcript: &str) -> EngineResult<Classification> {
        Ok(RuleClassifier::classify(self, transcript))
    }
}

/// Model-backed classifier with a hard per-call deadline
pub struct LlmBackend {
    client: Arc<OllamaClient>,
    deadline: Duration,
}

impl LlmBackend {
    pub fn new(client: Arc<OllamaClient>, deadline_ms: u64) -> Self {
        Self {
            client,
            deadline: Duration::from_millis(deadline_ms),
        }
    }
}

#[async_trait]
impl ClassifierBackend for LlmBackend {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify(&self, transcript: &str) -> EngineResult<Classification> {
        let deadline_ms = self.deadline.as_millis() as u64;
        match tokio::time::timeout(self.deadline, self.client.classify_transcript(transcript)).await
        {
            Ok(Ok(classification)) => Ok(classification),
            Ok(Err(e)) => Err(TriageError::Llm(e)),
            Err(_) => {
                debug!(deadline_ms, "Model call cancelled at deadline");
                Err(TriageError::DeadlineExceeded { deadline_ms })
            }
        }
    }
}
