// =====================================================================================
// File: core-events/src/events.rs
// Description: Event payloads published to the operator socket channel
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use chrono::{DateTime, Utc};
use core_model::{CallRecord, CallStatus};
use serde::{Deserialize, Serialize};

/// Partial update sent when a call's lifecycle state changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallUpdatePayload {
    pub call_sid: String,
    pub status: CallStatus,
    pub assigned_unit: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Rolling-window counters for the dashboard header
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_calls: i64,
    pub pending_calls: i64,
    pub in_progress_calls: i64,
    pub critical_calls: i64,
    pub escalated_calls: i64,
}

/// Events on the live operator channel, tagged by event name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum CallEvent {
    /// Full snapshot of a freshly triaged call
    #[serde(rename = "new_call")]
    NewCall(Box<CallRecord>),
    /// Lifecycle change for an existing call
    #[serde(rename = "call_update")]
    CallUpdate(CallUpdatePayload),
    /// Aggregate counters over the rolling 24h window
    #[serde(rename = "stats_update")]
    StatsUpdate(StatsSnapshot),
}

impl CallEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CallEvent::NewCall(_) => "new_call",
            CallEvent::CallUpdate(_) => "call_update",
            CallEvent::StatsUpdate(_) => "stats_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_tag_by_name() {
        let event = CallEvent::CallUpdate(CallUpdatePayload {
            call_sid: "CA100".to_string(),
            status: CallStatus::Dispatched,
            assigned_unit: Some("Engine 7".to_string()),
            updated_at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "call_update");
        assert_eq!(json["data"]["call_sid"], "CA100");
        assert_eq!(json["data"]["status"], "DISPATCHED");
    }

    #[test]
    fn test_stats_snapshot_is_camel_case() {
        let event = CallEvent::StatsUpdate(StatsSnapshot {
            total_calls: 12,
            pending_calls: 3,
            in_progress_calls: 2,
            critical_calls: 1,
            escalated_calls: 1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "stats_update");
        assert_eq!(json["data"]["totalCalls"], 12);
        assert_eq!(json["data"]["criticalCalls"], 1);
    }
}
