// =====================================================================================
// File: service-voice/src/api.rs
// Description: Operator JSON API - call listing, updates, notes, analytics, health
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use actix_web::{web, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

use core_database::{parse_status_strict, CallFilters, CallRepository};
use core_events::{CallEvent, CallUpdatePayload};
use core_model::{
    normalize, CallNote, CallRecord, EmergencyType, SeverityLevel,
};
use core_observability::HealthCheckResult;

use crate::AppState;

fn json_error(status: actix_web::http::StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": message.into(),
    }))
}

fn repository(state: &AppState) -> Result<&CallRepository, HttpResponse> {
    state.repository.as_deref().ok_or_else(|| {
        json_error(
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
            "persistence unavailable",
        )
    })
}

/// Query parameters for the paged call listing
#[derive(Debug, Deserialize)]
pub struct ListCallsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub severity: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// GET /api/calls
pub async fn list_calls(
    state: web::Data<AppState>,
    query: web::Query<ListCallsQuery>,
) -> ActixResult<HttpResponse> {
    let repo = match repository(&state) {
        Ok(repo) => repo,
        Err(resp) => return Ok(resp),
    };

    let mut filters = CallFilters::new(query.limit.unwrap_or(100), query.offset.unwrap_or(0));
    // Filters are operator input: strict parsing, 400 on garbage
    if let Some(raw) = &query.status {
        match parse_status_strict(raw) {
            Ok(status) => filters.status = Some(status),
            Err(_) => {
                return Ok(json_error(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    format!("unknown status '{raw}'"),
                ))
            }
        }
    }
    if let Some(raw) = &query.kind {
        match normalize::<EmergencyType>(raw) {
            Ok(kind) => filters.emergency_type = Some(kind),
            Err(_) => {
                return Ok(json_error(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    format!("unknown emergency type '{raw}'"),
                ))
            }
        }
    }
    if let Some(raw) = &query.severity {
        match normalize::<SeverityLevel>(raw) {
            Ok(severity) => filters.severity_level = Some(severity),
            Err(_) => {
                return Ok(json_error(
                    actix_web::http::StatusCode::BAD_REQUEST,
                    format!("unknown severity '{raw}'"),
                ))
            }
        }
    }
    filters.date_from = query.from;
    filters.date_to = query.to;

    match repo.list_calls(&filters).await {
        Ok(calls) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "calls": calls,
            "total": calls.len(),
            "limit": filters.limit,
            "offset": filters.offset,
        }))),
        Err(e) => {
            error!(error = %e, "Failed to list calls");
            Ok(json_error(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "failed to retrieve calls",
            ))
        }
    }
}

/// One call with its notes
#[derive(Debug, Serialize)]
pub struct CallDetailResponse {
    #[serde(flatten)]
    pub call: CallRecord,
    pub notes: Vec<CallNote>,
}

/// GET /api/calls/{id}
pub async fn get_call(state: web::Data<AppState>, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    let repo = match repository(&state) {
        Ok(repo) => repo,
        Err(resp) => return Ok(resp),
    };
    let id = path.into_inner();

    match repo.get_by_id(id).await {
        Ok(Some(call)) => {
            let notes = repo.notes_for_call(call.id).await.unwrap_or_else(|e| {
                warn!(call_id = call.id, error = %e, "Failed to load call notes");
                Vec::new()
            });
            Ok(HttpResponse::Ok().json(CallDetailResponse { call, notes }))
        }
        Ok(None) => Ok(json_error(
            actix_web::http::StatusCode::NOT_FOUND,
            format!("call {id} not found"),
        )),
        Err(e) => {
            error!(id, error = %e, "Failed to load call");
            Ok(json_error(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "failed to retrieve call",
            ))
        }
    }
}

/// Body for PUT /api/calls/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCallRequest {
    pub status: Option<String>,
    #[validate(length(max = 50))]
    pub assigned_unit: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub note: Option<String>,
}

/// PUT /api/calls/{id} - status / assignment / note updates from operators
pub async fn update_call(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateCallRequest>,
) -> ActixResult<HttpResponse> {
    let repo = match repository(&state) {
        Ok(repo) => repo,
        Err(resp) => return Ok(resp),
    };
    let id = path.into_inner();

    if let Err(e) = body.validate() {
        return Ok(json_error(
            actix_web::http::StatusCode::BAD_REQUEST,
            e.to_string(),
        ));
    }

    // Status values are validated against the closed set before touching storage
    let status = match body.status.as_deref().map(parse_status_strict).transpose() {
        Ok(status) => status,
        Err(_) => {
            return Ok(json_error(
                actix_web::http::StatusCode::BAD_REQUEST,
                format!("unknown status '{}'", body.status.as_deref().unwrap_or("")),
            ))
        }
    };

    let Some(mut call) = repo.get_by_id(id).await.map_err(|e| {
        error!(id, error = %e, "Failed to load call for update");
        actix_web::error::ErrorInternalServerError("failed to load call")
    })?
    else {
        return Ok(json_error(
            actix_web::http::StatusCode::NOT_FOUND,
            format!("call {id} not found"),
        ));
    };

    if let Some(status) = status {
        call = match repo
            .update_status(&call.call_sid, status, body.assigned_unit.as_deref())
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                error!(id, error = %e, "Failed to update call status");
                return Ok(json_error(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to update call",
                ));
            }
        };

        info!(call_sid = %call.call_sid, status = call.status.as_str(), "Call updated by operator");
        let update = CallEvent::CallUpdate(CallUpdatePayload {
            call_sid: call.call_sid.clone(),
            status: call.status,
            assigned_unit: call.assigned_unit.clone(),
            updated_at: call.updated_at.unwrap_or_else(Utc::now),
        });
        if state.hub.publish(update).is_err() {
            state.metrics.broadcast_drops.inc();
        }
    }

    if let Some(note) = &body.note {
        if let Err(e) = repo.add_note(call.id, note, None).await {
            warn!(call_id = call.id, error = %e, "Failed to attach note");
        }
    }

    let notes = repo.notes_for_call(call.id).await.unwrap_or_default();
    Ok(HttpResponse::Ok().json(CallDetailResponse { call, notes }))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub hours: Option<i64>,
}

/// GET /api/analytics
pub async fn analytics(
    state: web::Data<AppState>,
    query: web::Query<AnalyticsQuery>,
) -> ActixResult<HttpResponse> {
    let repo = match repository(&state) {
        Ok(repo) => repo,
        Err(resp) => return Ok(resp),
    };

    let window = query.hours.unwrap_or(24).clamp(1, 24 * 90);
    match repo.analytics(window).await {
        Ok(analytics) => Ok(HttpResponse::Ok().json(analytics)),
        Err(e) => {
            error!(error = %e, "Failed to compute analytics");
            Ok(json_error(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "failed to compute analytics",
            ))
        }
    }
}

/// GET /health
pub async fn health(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let result = match &state.repository {
        Some(repo) => match core_database::health_check(repo.pool()).await {
            Ok(()) => HealthCheckResult::healthy(),
            Err(e) => HealthCheckResult::unhealthy(format!("database: {e}")),
        },
        None => HealthCheckResult::degraded("persistence disabled"),
    }
    .with_detail("service", serde_json::json!("rapid100-voice"))
    .with_detail(
        "active_sessions",
        serde_json::json!(state.sessions.active_sessions().await),
    )
    .with_detail(
        "live_subscribers",
        serde_json::json!(state.hub.subscriber_count()),
    );

    Ok(HttpResponse::Ok().json(result))
}

/// GET /metrics - Prometheus exposition
pub async fn metrics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match state.metrics.gather() {
        Ok(text) => Ok(HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(text)),
        Err(e) => {
            error!(error = %e, "Failed to gather metrics");
            Ok(HttpResponse::InternalServerError().finish())
        }
    }
}
