// =====================================================================================
// File: core-ai/src/lib.rs
// Description: Local model integration for the Rapid100 triage platform
// Author: arkSong (arksong2018@gmail.com)
// Framework: Rapid100 - AI-Powered Emergency Call Triage Platform
// =====================================================================================

//! # Core AI Module
//!
//! Client for the local Ollama model service. One chat call performs the
//! whole triage analysis - classification, severity, routing suggestion,
//! and summary - returned as a strict JSON object. Anything the model gets
//! wrong is coerced into the canonical model or replaced by safe defaults;
//! a reply that is not a single JSON object is retried once and then
//! reported as an error so the caller can fall back.

pub mod models;
pub mod ollama;

pub use models::{ChatMessage, OllamaChatRequest, OllamaChatResponse, OllamaOptions, TriageReply};
pub use ollama::{OllamaClient, OllamaError};
