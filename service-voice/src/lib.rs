// =====================================================================================
// File: service-voice/src/lib.rs
// Description: Telephony webhook service for the Rapid100 emergency triage platform
// Author: arkSong (arksong2018@gmail.com)
// Framework: Rapid100 - AI-Powered Emergency Call Triage Platform
// =====================================================================================

//! # Voice Service
//!
//! The outer shell of the triage platform: accepts the telephony provider's
//! form-encoded webhooks, drives each call through the session state
//! machine, and serves the operator-facing JSON API and live event socket.
//! Persistence and broadcast always happen off the response path; every
//! caller-visible failure is a spoken apology followed by a hangup.

pub mod api;
pub mod session;
pub mod twiml;
pub mod voice;
pub mod websocket;

use actix_web::web;
use std::sync::Arc;

use core_config::AppConfig;
use core_database::CallRepository;
use core_events::BroadcastHub;
use core_observability::TriageMetrics;

pub use session::{SessionManager, TurnReply};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<SessionManager>,
    pub repository: Option<Arc<CallRepository>>,
    pub hub: BroadcastHub,
    pub metrics: Arc<TriageMetrics>,
}

/// Register every route on the application
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/voice", web::post().to(voice::incoming_call))
        .route("/voice/process", web::post().to(voice::process_speech))
        .route("/voice/followup", web::post().to(voice::process_followup))
        .route("/voice/status", web::post().to(voice::call_status))
        .service(
            web::scope("/api")
                .route("/calls", web::get().to(api::list_calls))
                .route("/calls/{id}", web::get().to(api::get_call))
                .route("/calls/{id}", web::put().to(api::update_call))
                .route("/analytics", web::get().to(api::analytics)),
        )
        .route("/ws", web::get().to(websocket::live_events))
        .route("/health", web::get().to(api::health))
        .route("/metrics", web::get().to(api::metrics));
}
