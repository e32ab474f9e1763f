// =====================================================================================
// File: service-voice/tests/integration.rs
// Description: Integration tests for the voice webhook surface and operator API.
//              Drives the actix app end-to-end with a stubbed persistence layer.
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use actix_web::{test, web, App};
use std::sync::Arc;

use core_config::AppConfig;
use core_events::BroadcastHub;
use core_observability::TriageMetrics;
use core_triage::TriageEngine;
use service_voice::{configure_app, AppState, SessionManager};

/// App state with the rule backend and no database behind it
fn test_state() -> web::Data<AppState> {
    let config = AppConfig::default();
    let engine = Arc::new(
        TriageEngine::new(&config.triage, None, config.llm.deadline_ms)
            .expect("rule backend always constructs"),
    );
    let hub = BroadcastHub::new(16, true);
    let metrics = Arc::new(TriageMetrics::new().expect("metrics"));
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&engine),
        None,
        hub.clone(),
        Arc::clone(&metrics),
        config.session.clone(),
    ));

    web::Data::new(AppState {
        config,
        sessions,
        repository: None,
        hub,
        metrics,
    })
}

macro_rules! voice_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(configure_app),
        )
        .await
    };
}

macro_rules! post_form {
    ($app:expr, $uri:expr, $form:expr $(,)?) => {{
        let req = test::TestRequest::post()
            .uri($uri)
            .set_form($form)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert!(resp.status().is_success(), "{} -> {}", $uri, resp.status());
        let body = test::read_body(resp).await;
        String::from_utf8(body.to_vec()).expect("utf-8 body")
    }};
}

#[actix_web::test]
async fn test_greeting_prompts_for_speech() {
    let state = test_state();
    let app = voice_app!(state);

    let body = post_form!(
        &app, "/voice", &[("CallSid", "CA100"), ("From", "+15550001111")]);
    assert!(body.contains("action=\"/voice/process\""));
    assert!(body.contains("describe your emergency"));
}

#[actix_web::test]
async fn test_fire_first_turn_opens_followup() {
    let state = test_state();
    let app = voice_app!(state);

    let body = post_form!(
        &app,
        "/voice/process",
        &[
            ("CallSid", "CA200"),
            ("From", "+15550001111"),
            ("SpeechResult", "There's a massive fire in the apartment building! People are trapped."),
        ],
    );

    assert!(body.contains("Help is coming"));
    assert!(body.contains("fire department"));
    assert!(body.contains("action=\"/voice/followup\""));
    assert!(body.contains("Is the fire spreading or are people trapped?"));
}

#[actix_web::test]
async fn test_followup_yes_escalates() {
    let state = test_state();
    let app = voice_app!(state);

    post_form!(
        &app,
        "/voice/process",
        &[
            ("CallSid", "CA300"),
            ("SpeechResult", "My husband is having severe chest pain and collapsed."),
        ],
    );

    let body = post_form!(
        &app,
        "/voice/followup",
        &[("CallSid", "CA300"), ("SpeechResult", "yes")],
    );

    assert!(body.contains("Priority increased to critical"));
    assert!(body.contains("<Hangup/>"));
}

#[actix_web::test]
async fn test_followup_no_completes() {
    let state = test_state();
    let app = voice_app!(state);

    post_form!(
        &app,
        "/voice/process",
        &[
            ("CallSid", "CA400"),
            ("SpeechResult", "There's a massive fire in the apartment building!"),
        ],
    );

    let body = post_form!(
        &app,
        "/voice/followup",
        &[("CallSid", "CA400"), ("SpeechResult", "no, it's contained now")],
    );

    assert!(body.contains("Help is on the way"));
    assert!(body.contains("<Hangup/>"));
}

#[actix_web::test]
async fn test_short_utterance_reprompts() {
    let state = test_state();
    let app = voice_app!(state);

    let body = post_form!(
        &app,
        "/voice/process",
        &[("CallSid", "CA500"), ("SpeechResult", "uh")],
    );

    assert!(body.contains("Please describe your emergency clearly."));
    assert!(body.contains("action=\"/voice/process\""));
}

#[actix_web::test]
async fn test_missing_call_sid_speaks_apology() {
    let state = test_state();
    let app = voice_app!(state);

    let body = post_form!(
        &app, "/voice/process", &[("SpeechResult", "there is a fire")]);
    assert!(body.contains("technical difficulties"));
    assert!(body.contains("<Hangup/>"));
}

#[actix_web::test]
async fn test_duplicate_delivery_is_idempotent() {
    let state = test_state();
    let app = voice_app!(state);

    let form = [
        ("CallSid", "CA600"),
        ("SpeechResult", "Multi-car crash on the highway, people trapped."),
    ];
    let first = post_form!(
        &app, "/voice/process", &form);
    let second = post_form!(
        &app, "/voice/process", &form);
    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_status_callback_ends_session() {
    let state = test_state();
    let app = voice_app!(state);

    post_form!(
        &app,
        "/voice/process",
        &[("CallSid", "CA700"), ("SpeechResult", "There's a fire in my kitchen right now")],
    );
    assert_eq!(state.sessions.active_sessions().await, 1);

    post_form!(
        &app,
        "/voice/status",
        &[("CallSid", "CA700"), ("CallStatus", "completed"), ("CallDuration", "42")],
    );
    assert_eq!(state.sessions.active_sessions().await, 0);
}

#[actix_web::test]
async fn test_health_reports_degraded_without_database() {
    let state = test_state();
    let app = voice_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["details"]["service"], "rapid100-voice");
}

#[actix_web::test]
async fn test_calls_api_unavailable_without_database() {
    let state = test_state();
    let app = voice_app!(state);

    let req = test::TestRequest::get().uri("/api/calls").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_metrics_exposition() {
    let state = test_state();
    let app = voice_app!(state);

    post_form!(
        &app,
        "/voice/process",
        &[("CallSid", "CA800"), ("SpeechResult", "Someone broke in and they have a gun")],
    );

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("rapid100_calls_processed_total"));
}
