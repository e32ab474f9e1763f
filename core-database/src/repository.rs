// =====================================================================================
// File: core-database/src/repository.rs
// Description: Call record repository - idempotent writes, healing reads, analytics
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

use core_model::{
    normalize, normalize_lossy, CallNote, CallRecord, CallStatus, EmergencyService, EmergencyType,
    SeverityLevel, TriageResult,
};

use crate::{DatabaseError, DatabaseResult};

/// Idempotent upsert keyed by the provider call identifier. Re-delivery of
/// the same call updates the row and bumps `updated_at`; `created_at` is
/// written once.
const UPSERT_SQL: &str = r#"
INSERT INTO call_records (
    call_sid, from_number, to_number, transcript,
    emergency_type, severity_level, severity_score, risk_indicators,
    assigned_service, priority, location_address, summary, confidence,
    spoken, immediate_actions, precautions, danger_question, escalated_spoken,
    status, assigned_unit, processing_time_ms, call_metadata, created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
ON CONFLICT (call_sid) DO UPDATE SET
    transcript = EXCLUDED.transcript,
    emergency_type = EXCLUDED.emergency_type,
    severity_level = EXCLUDED.severity_level,
    severity_score = EXCLUDED.severity_score,
    risk_indicators = EXCLUDED.risk_indicators,
    assigned_service = EXCLUDED.assigned_service,
    priority = EXCLUDED.priority,
    location_address = EXCLUDED.location_address,
    summary = EXCLUDED.summary,
    confidence = EXCLUDED.confidence,
    spoken = EXCLUDED.spoken,
    immediate_actions = EXCLUDED.immediate_actions,
    precautions = EXCLUDED.precautions,
    danger_question = EXCLUDED.danger_question,
    escalated_spoken = EXCLUDED.escalated_spoken,
    status = EXCLUDED.status,
    assigned_unit = EXCLUDED.assigned_unit,
    processing_time_ms = EXCLUDED.processing_time_ms,
    call_metadata = EXCLUDED.call_metadata,
    updated_at = NOW()
RETURNING *
"#;

const SELECT_COLUMNS: &str = "SELECT * FROM call_records";

/// Filters for the paged call listing
#[derive(Debug, Clone, Default)]
pub struct CallFilters {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<CallStatus>,
    pub emergency_type: Option<EmergencyType>,
    pub severity_level: Option<SeverityLevel>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl CallFilters {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, 1000),
            offset: offset.max(0),
            ..Self::default()
        }
    }
}

/// Aggregates for the operator dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalytics {
    pub total_calls: i64,
    pub calls_by_status: HashMap<String, i64>,
    pub calls_by_kind: HashMap<String, i64>,
    pub calls_by_severity: HashMap<String, i64>,
    pub average_processing_seconds: f64,
    pub calls_by_hour: Vec<i64>,
    pub calls_by_day_of_week: Vec<i64>,
}

/// Repository owning all reads and writes of call rows.
///
/// Writes retry transient failures with exponential backoff and never block
/// the caller's response path; reads heal legacy enum spellings through the
/// canonical model before a row leaves this module.
#[derive(Clone)]
pub struct CallRepository {
    pool: Pool<Postgres>,
    write_retries: u32,
}

impl CallRepository {
    pub fn new(pool: Pool<Postgres>, write_retries: u32) -> Self {
        Self {
            pool,
            write_retries: write_retries.max(1),
        }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Idempotent upsert with bounded retries. Exhausted retries log at
    /// error and surface the failure; callers on the response path drop it.
    pub async fn upsert_call(&self, record: &CallRecord) -> DatabaseResult<CallRecord> {
        let mut attempt = 0u32;
        loop {
            match self.upsert_call_once(record).await {
                Ok(stored) => {
                    info!(call_sid = %stored.call_sid, id = stored.id, "Call record upserted");
                    return Ok(stored);
                }
                Err(e) if e.is_transient() && attempt + 1 < self.write_retries => {
                    let backoff = Duration::from_millis(100 * 2u64.pow(attempt));
                    warn!(
                        call_sid = %record.call_sid,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient persistence failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(call_sid = %record.call_sid, error = %e, "Call record write failed");
                    return Err(e);
                }
            }
        }
    }

    async fn upsert_call_once(&self, record: &CallRecord) -> DatabaseResult<CallRecord> {
        let triage = &record.triage;
        let row = sqlx::query(UPSERT_SQL)
            .bind(&record.call_sid)
            .bind(&record.from_number)
            .bind(&record.to_number)
            .bind(&triage.transcript)
            .bind(triage.emergency_type.as_str())
            .bind(triage.severity_level.as_str())
            .bind(triage.severity_score)
            .bind(serde_json::to_value(&triage.risk_indicators)?)
            .bind(triage.assigned_service.as_str())
            .bind(triage.priority)
            .bind(&triage.location)
            .bind(&triage.summary)
            .bind(triage.confidence)
            .bind(&triage.spoken)
            .bind(serde_json::to_value(&triage.immediate_actions)?)
            .bind(serde_json::to_value(&triage.precautions)?)
            .bind(&triage.danger_question)
            .bind(&triage.escalated_spoken)
            .bind(record.status.as_str())
            .bind(&record.assigned_unit)
            .bind(triage.processing_time_ms)
            .bind(&record.metadata)
            .bind(triage.created_at)
            .fetch_one(&self.pool)
            .await?;

        row_to_record(&row)
    }

    pub async fn get_by_call_sid(&self, call_sid: &str) -> DatabaseResult<Option<CallRecord>> {
        let row = sqlx::query(&format!("{} WHERE call_sid = $1", SELECT_COLUMNS))
            .bind(call_sid)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    pub async fn get_by_id(&self, id: i64) -> DatabaseResult<Option<CallRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    /// Paged listing with optional status/kind/severity/date filters
    pub async fn list_calls(&self, filters: &CallFilters) -> DatabaseResult<Vec<CallRecord>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM call_records WHERE TRUE");

        if let Some(status) = filters.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(kind) = filters.emergency_type {
            builder.push(" AND emergency_type = ").push_bind(kind.as_str());
        }
        if let Some(severity) = filters.severity_level {
            builder.push(" AND severity_level = ").push_bind(severity.as_str());
        }
        if let Some(from) = filters.date_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filters.date_to {
            builder.push(" AND created_at <= ").push_bind(to);
        }
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filters.limit)
            .push(" OFFSET ")
            .push_bind(filters.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Calls created inside the rolling window
    pub async fn list_recent(&self, window_hours: i64) -> DatabaseResult<Vec<CallRecord>> {
        let since = Utc::now() - ChronoDuration::hours(window_hours);
        let rows = sqlx::query(&format!(
            "{} WHERE created_at >= $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Update lifecycle status (and optionally the assigned unit) by call sid
    pub async fn update_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        assigned_unit: Option<&str>,
    ) -> DatabaseResult<CallRecord> {
        let row = sqlx::query(
            r#"
            UPDATE call_records
            SET status = $2,
                assigned_unit = COALESCE($3, assigned_unit),
                updated_at = NOW()
            WHERE call_sid = $1
            RETURNING *
            "#,
        )
        .bind(call_sid)
        .bind(status.as_str())
        .bind(assigned_unit)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("call {}", call_sid)))?;

        row_to_record(&row)
    }

    pub async fn add_note(
        &self,
        call_id: i64,
        note: &str,
        created_by: Option<&str>,
    ) -> DatabaseResult<CallNote> {
        let row = sqlx::query(
            r#"
            INSERT INTO call_notes (call_id, note, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, call_id, note, created_by, created_at
            "#,
        )
        .bind(call_id)
        .bind(note)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_note(&row))
    }

    pub async fn notes_for_call(&self, call_id: i64) -> DatabaseResult<Vec<CallNote>> {
        let rows = sqlx::query(
            "SELECT id, call_id, note, created_by, created_at FROM call_notes \
             WHERE call_id = $1 ORDER BY created_at ASC",
        )
        .bind(call_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_note).collect())
    }

    /// Dashboard aggregates over the rolling window
    pub async fn analytics(&self, window_hours: i64) -> DatabaseResult<CallAnalytics> {
        let since = Utc::now() - ChronoDuration::hours(window_hours);

        let total_row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(AVG(processing_time_ms), 0) AS avg_ms \
             FROM call_records WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        let total_calls: i64 = total_row.get("total");
        let average_processing_seconds: f64 = total_row.get::<f64, _>("avg_ms") / 1000.0;

        let calls_by_status = self.group_counts("status", since).await?;
        let calls_by_kind = self.group_counts("emergency_type", since).await?;
        let calls_by_severity = self.group_counts("severity_level", since).await?;

        let mut calls_by_hour = vec![0i64; 24];
        let hour_rows = sqlx::query(
            "SELECT EXTRACT(HOUR FROM created_at)::INT AS bucket, COUNT(*) AS calls \
             FROM call_records WHERE created_at >= $1 GROUP BY bucket",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        for row in hour_rows {
            let bucket: i32 = row.get("bucket");
            if (0..24).contains(&bucket) {
                calls_by_hour[bucket as usize] = row.get("calls");
            }
        }

        // ISO day of week, Monday = 1
        let mut calls_by_day_of_week = vec![0i64; 7];
        let day_rows = sqlx::query(
            "SELECT EXTRACT(ISODOW FROM created_at)::INT AS bucket, COUNT(*) AS calls \
             FROM call_records WHERE created_at >= $1 GROUP BY bucket",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        for row in day_rows {
            let bucket: i32 = row.get("bucket");
            if (1..=7).contains(&bucket) {
                calls_by_day_of_week[(bucket - 1) as usize] = row.get("calls");
            }
        }

        Ok(CallAnalytics {
            total_calls,
            calls_by_status,
            calls_by_kind,
            calls_by_severity,
            average_processing_seconds,
            calls_by_hour,
            calls_by_day_of_week,
        })
    }

    async fn group_counts(
        &self,
        column: &str,
        since: DateTime<Utc>,
    ) -> DatabaseResult<HashMap<String, i64>> {
        // `column` is one of our own identifiers, never user input
        let rows = sqlx::query(&format!(
            "SELECT {column} AS bucket, COUNT(*) AS calls FROM call_records \
             WHERE created_at >= $1 GROUP BY bucket"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in rows {
            let raw: String = row.get("bucket");
            // Heal legacy spellings so the dashboard only ever sees canonical keys
            let canonical = match column {
                "status" => normalize_lossy::<CallStatus>(&raw).as_str().to_string(),
                "emergency_type" => normalize_lossy::<EmergencyType>(&raw).as_str().to_string(),
                "severity_level" => normalize_lossy::<SeverityLevel>(&raw).as_str().to_string(),
                _ => raw,
            };
            *counts.entry(canonical).or_insert(0) += row.get::<i64, _>("calls");
        }
        Ok(counts)
    }
}

/// Map one row into the canonical record, healing legacy enum spellings
fn row_to_record(row: &PgRow) -> DatabaseResult<CallRecord> {
    let emergency_type: String = row.get("emergency_type");
    let severity_level: String = row.get("severity_level");
    let assigned_service: String = row.get("assigned_service");
    let status: String = row.get("status");

    let triage = TriageResult {
        transcript: row.get("transcript"),
        emergency_type: normalize_lossy::<EmergencyType>(&emergency_type),
        severity_level: normalize_lossy::<SeverityLevel>(&severity_level),
        severity_score: row.get("severity_score"),
        risk_indicators: value_to_strings(row.get("risk_indicators")),
        assigned_service: normalize_lossy::<EmergencyService>(&assigned_service),
        priority: row.get("priority"),
        location: row.get("location_address"),
        summary: row.get("summary"),
        confidence: row.get("confidence"),
        spoken: row.get("spoken"),
        immediate_actions: value_to_strings(row.get("immediate_actions")),
        precautions: value_to_strings(row.get("precautions")),
        danger_question: row.get("danger_question"),
        escalated_spoken: row.get("escalated_spoken"),
        processing_time_ms: row.get("processing_time_ms"),
        created_at: row.get("created_at"),
    };

    Ok(CallRecord {
        id: row.get("id"),
        call_sid: row.get("call_sid"),
        from_number: row.get("from_number"),
        to_number: row.get("to_number"),
        triage,
        status: normalize_lossy::<CallStatus>(&status),
        assigned_unit: row.get("assigned_unit"),
        metadata: row.get("call_metadata"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_note(row: &PgRow) -> CallNote {
    CallNote {
        id: row.get("id"),
        call_id: row.get("call_id"),
        note: row.get("note"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn value_to_strings(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Validate a status string coming from the operator API; strict, no healing
pub fn parse_status_strict(raw: &str) -> DatabaseResult<CallStatus> {
    normalize::<CallStatus>(raw)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_is_keyed_by_call_sid() {
        assert!(UPSERT_SQL.contains("ON CONFLICT (call_sid) DO UPDATE"));
        // created_at is written once; re-deliveries only bump updated_at
        assert!(!UPSERT_SQL.contains("created_at = EXCLUDED"));
        assert!(UPSERT_SQL.contains("updated_at = NOW()"));
    }

    #[test]
    fn test_filters_clamp_paging() {
        let filters = CallFilters::new(5_000, -3);
        assert_eq!(filters.limit, 1000);
        assert_eq!(filters.offset, 0);
    }

    #[test]
    fn test_value_to_strings_tolerates_shapes() {
        assert_eq!(
            value_to_strings(serde_json::json!(["a", "b"])),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(value_to_strings(serde_json::json!({"not": "a list"})).is_empty());
        assert!(value_to_strings(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_strict_status_parse() {
        assert_eq!(parse_status_strict("dispatched").unwrap(), CallStatus::Dispatched);
        assert_eq!(parse_status_strict("In Progress").unwrap(), CallStatus::InProgress);
        assert!(parse_status_strict("teleported").is_err());
    }
}
