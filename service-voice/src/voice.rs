// =====================================================================================
// File: service-voice/src/voice.rs
// Description: Telephony webhook endpoints - greeting, first turn, follow-up, status
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::session::TurnReply;
use crate::twiml::{self, VoiceResponse};
use crate::AppState;

/// Form fields the provider posts on every webhook
#[derive(Debug, Deserialize, Default)]
pub struct VoiceForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
    #[serde(rename = "UnstableSpeechResult")]
    pub unstable_speech_result: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
}

impl VoiceForm {
    /// Finalized transcription preferred, partial as fallback
    fn transcript(&self) -> String {
        self.speech_result
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.unstable_speech_result.clone())
            .unwrap_or_default()
    }

    fn require_call_sid(&self) -> Option<&str> {
        self.call_sid.as_deref().filter(|sid| !sid.trim().is_empty())
    }
}

fn xml_response(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type("application/xml").body(body)
}

/// POST /voice - greet the caller and prompt for speech
pub async fn incoming_call(state: web::Data<AppState>, form: web::Form<VoiceForm>) -> ActixResult<HttpResponse> {
    info!(
        call_sid = form.call_sid.as_deref().unwrap_or("unknown"),
        from = form.from.as_deref().unwrap_or(""),
        "Incoming emergency call"
    );
    Ok(xml_response(twiml::greeting(
        state.config.session.speech_timeout_seconds,
    )))
}

/// POST /voice/process - first-turn triage
pub async fn process_speech(state: web::Data<AppState>, form: web::Form<VoiceForm>) -> ActixResult<HttpResponse> {
    let Some(call_sid) = form.require_call_sid() else {
        warn!("Webhook missing CallSid, answering with error call-flow");
        return Ok(xml_response(twiml::error_response()));
    };

    let transcript = form.transcript();
    let metadata = serde_json::json!({
        "from": form.from.clone().unwrap_or_default(),
        "to": form.to.clone().unwrap_or_default(),
        "speech_result": form.speech_result,
        "unstable_speech_result": form.unstable_speech_result,
    });

    let deadline = Duration::from_millis(state.config.server.request_deadline_ms);
    let turn = tokio::time::timeout(
        deadline,
        state.sessions.handle_first_turn(
            call_sid,
            form.from.as_deref().unwrap_or(""),
            form.to.as_deref().unwrap_or(""),
            &transcript,
            metadata,
        ),
    )
    .await;

    let reply = match turn {
        Ok(reply) => reply,
        Err(_) => {
            error!(call_sid, "First-turn processing missed the response deadline");
            return Ok(xml_response(twiml::degraded_response()));
        }
    };

    Ok(xml_response(render_reply(state.as_ref(), reply)))
}

/// POST /voice/followup - yes/no danger answer
pub async fn process_followup(state: web::Data<AppState>, form: web::Form<VoiceForm>) -> ActixResult<HttpResponse> {
    let Some(call_sid) = form.require_call_sid() else {
        warn!("Follow-up missing CallSid, answering with error call-flow");
        return Ok(xml_response(twiml::error_response()));
    };

    let transcript = form.transcript();
    let deadline = Duration::from_millis(state.config.server.request_deadline_ms);
    let turn = tokio::time::timeout(
        deadline,
        state.sessions.handle_followup(call_sid, &transcript),
    )
    .await;

    let reply = match turn {
        Ok(reply) => reply,
        Err(_) => {
            error!(call_sid, "Follow-up processing missed the response deadline");
            return Ok(xml_response(twiml::degraded_response()));
        }
    };

    Ok(xml_response(render_reply(state.as_ref(), reply)))
}

/// POST /voice/status - provider lifecycle notifications
pub async fn call_status(state: web::Data<AppState>, form: web::Form<VoiceForm>) -> ActixResult<HttpResponse> {
    let Some(call_sid) = form.require_call_sid() else {
        return Ok(HttpResponse::BadRequest().finish());
    };

    let status = form.call_status.as_deref().unwrap_or("");
    info!(
        call_sid,
        status,
        duration = form.call_duration.as_deref().unwrap_or("0"),
        "Call status update"
    );
    state.sessions.handle_status_callback(call_sid, status).await;

    Ok(HttpResponse::Ok().finish())
}

/// Translate a state-machine reply into the call-flow document
fn render_reply(state: &AppState, reply: TurnReply) -> String {
    let speech_timeout = state.config.session.speech_timeout_seconds;
    match reply {
        TurnReply::Reprompt { spoken } => VoiceResponse::new()
            .gather("/voice/process", speech_timeout, spoken)
            .say("Emergency recorded. Assistance is being arranged.")
            .hangup()
            .build(),
        TurnReply::AwaitFollowup { spoken, danger_question } => VoiceResponse::new()
            .say(spoken)
            .pause(1)
            .gather("/voice/followup", speech_timeout, danger_question)
            .say("Help is on the way. Stay safe and keep your phone nearby.")
            .hangup()
            .build(),
        TurnReply::ReAsk { spoken, danger_question } => VoiceResponse::new()
            .say(spoken)
            .gather("/voice/followup", speech_timeout, danger_question)
            .say("Help is on the way. Stay safe.")
            .hangup()
            .build(),
        TurnReply::Escalated { spoken } => VoiceResponse::new()
            .say(spoken)
            .pause(1)
            .say("Stay on the line if you can. Responders are on their way.")
            .hangup()
            .build(),
        TurnReply::Completed { spoken } => VoiceResponse::new()
            .say(spoken)
            .pause(1)
            .say("Thank you for calling. Goodbye.")
            .hangup()
            .build(),
    }
}
