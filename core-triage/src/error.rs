// =====================================================================================
// File: core-triage/src/error.rs
// Description: Error types for the triage pipeline
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use thiserror::Error;

/// Result type for triage engine operations
pub type EngineResult<T> = Result<T, TriageError>;

/// Triage pipeline error types.
///
/// Classification itself never fails a call; these errors cover backend
/// construction and the failures a backend reports before the engine falls
/// back to a safe outcome.
#[derive(Error, Debug)]
pub enum TriageError {
    /// The configured backend cannot be constructed
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend call exceeded its deadline
    #[error("Backend timed out after {deadline_ms}ms")]
    DeadlineExceeded { deadline_ms: u64 },

    /// The model client failed
    #[error("Model backend error: {0}")]
    Llm(#[from] core_ai::OllamaError),
}
