// =====================================================================================
// File: service-voice/src/session.rs
// Description: Per-call conversation state machine with follow-up escalation
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use core_config::SessionConfig;
use core_database::CallRepository;
use core_events::{BroadcastHub, CallEvent, CallUpdatePayload, StatsSnapshot};
use core_model::{
    CallRecord, CallStatus, ConversationPhase, ConversationState, SeverityLevel, TriageResult,
};
use core_observability::TriageMetrics;
use core_triage::TriageEngine;

/// Minimum first utterance: 5 characters and 2 words
const MIN_UTTERANCE_CHARS: usize = 5;
const MIN_UTTERANCE_TOKENS: usize = 2;

const YES_WORDS: &[&str] = &["yes", "yeah", "true", "correct", "affirmative"];
const NO_WORDS: &[&str] = &["no", "nope", "fine", "false", "negative"];

const REPROMPT_SPOKEN: &str = "Please describe your emergency clearly.";
const GIVE_UP_SPOKEN: &str =
    "We could not hear your emergency. If you need help, please call back. Goodbye.";
const COMPLETED_SPOKEN: &str =
    "Understood. Help is on the way. We will end the call now. Stay safe.";
const REASSURANCE_SPOKEN: &str = "Help is on the way. Stay safe.";
const REASK_SPOKEN: &str = "I didn't catch that. Please say yes or no.";
const UNCLEAR_GIVE_UP_SPOKEN: &str =
    "We will send help based on what you told us. Help is on the way. Stay safe.";

/// What the webhook surface should speak next
#[derive(Debug, Clone, PartialEq)]
pub enum TurnReply {
    /// Ask the caller to repeat the first utterance
    Reprompt { spoken: String },
    /// Speak the outcome, then gather the yes/no danger answer
    AwaitFollowup { spoken: String, danger_question: String },
    /// Re-ask the danger question after an unclear answer
    ReAsk { spoken: String, danger_question: String },
    /// Escalated to critical; speak confirmation and close
    Escalated { spoken: String },
    /// Conversation over; speak closing reassurance and hang up
    Completed { spoken: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FollowupAnswer {
    Yes,
    No,
    Unclear,
}

/// Parse a follow-up answer. Checked word-by-word; an utterance containing
/// both resolves YES so uncertainty escalates rather than closes.
fn parse_answer(transcript: &str) -> FollowupAnswer {
    let lowered = transcript.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| YES_WORDS.contains(w)) {
        FollowupAnswer::Yes
    } else if words.iter().any(|w| NO_WORDS.contains(w)) {
        FollowupAnswer::No
    } else {
        FollowupAnswer::Unclear
    }
}

/// One live conversation: the C1 state plus the persistence draft
#[derive(Debug, Clone)]
struct CallSession {
    state: ConversationState,
    record: CallRecord,
}

#[derive(Debug, Clone, Copy)]
struct RepromptState {
    count: u8,
    last_attempt_at: chrono::DateTime<Utc>,
}

/// Owns every ConversationState, keyed by call sid.
///
/// Turns for one call serialize behind the per-session mutex, held only for
/// state evaluation; persistence and broadcast always run on spawned tasks
/// after the reply is decided. A background sweeper evicts sessions past
/// the inactivity TTL or in a terminal phase.
pub struct SessionManager {
    engine: Arc<TriageEngine>,
    repository: Option<Arc<CallRepository>>,
    hub: BroadcastHub,
    metrics: Arc<TriageMetrics>,
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Arc<Mutex<CallSession>>>>,
    reprompts: RwLock<HashMap<String, RepromptState>>,
}

impl SessionManager {
    pub fn new(
        engine: Arc<TriageEngine>,
        repository: Option<Arc<CallRepository>>,
        hub: BroadcastHub,
        metrics: Arc<TriageMetrics>,
        config: SessionConfig,
    ) -> Self {
        Self {
            engine,
            repository,
            hub,
            metrics,
            config,
            sessions: RwLock::new(HashMap::new()),
            reprompts: RwLock::new(HashMap::new()),
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// First turn: validate, triage, open the follow-up conversation
    #[instrument(skip(self, transcript, metadata), fields(call_sid = %call_sid))]
    pub async fn handle_first_turn(
        &self,
        call_sid: &str,
        from_number: &str,
        to_number: &str,
        transcript: &str,
        metadata: serde_json::Value,
    ) -> TurnReply {
        let trimmed = transcript.trim();
        let token_count = trimmed.split_whitespace().count();

        if trimmed.len() < MIN_UTTERANCE_CHARS || token_count < MIN_UTTERANCE_TOKENS {
            return self.reprompt(call_sid).await;
        }

        // Duplicate webhook delivery: replay the cached turn verbatim
        if let Some(entry) = self.get_session(call_sid).await {
            let session = entry.lock().await;
            if session.state.phase == ConversationPhase::AwaitingFollowup
                && session.state.last_transcript.as_deref() == Some(trimmed)
            {
                debug!("Duplicate first-turn delivery, replaying cached outcome");
                return TurnReply::AwaitFollowup {
                    spoken: session.record.triage.spoken.clone(),
                    danger_question: session.state.danger_question.clone(),
                };
            }
        }

        let outcome = self.engine.process(trimmed).await;
        self.observe(&outcome);

        let state = ConversationState::from_outcome(call_sid, &outcome);
        let reply = TurnReply::AwaitFollowup {
            spoken: outcome.spoken.clone(),
            danger_question: outcome.danger_question.clone(),
        };

        let record = CallRecord {
            id: 0,
            call_sid: call_sid.to_string(),
            from_number: from_number.to_string(),
            to_number: to_number.to_string(),
            triage: outcome,
            status: CallStatus::AwaitingFollowup,
            assigned_unit: None,
            metadata,
            updated_at: None,
        };

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                call_sid.to_string(),
                Arc::new(Mutex::new(CallSession {
                    state,
                    record: record.clone(),
                })),
            );
        }
        self.reprompts.write().await.remove(call_sid);

        info!(
            kind = record.triage.emergency_type.as_str(),
            severity = record.triage.severity_level.as_str(),
            service = record.triage.assigned_service.as_str(),
            priority = record.triage.priority,
            "Call triaged, awaiting follow-up"
        );

        self.spawn_persist_new(record);
        reply
    }

    /// Follow-up turn: escalate on YES, complete on NO, re-ask when unclear
    #[instrument(skip(self, transcript), fields(call_sid = %call_sid))]
    pub async fn handle_followup(&self, call_sid: &str, transcript: &str) -> TurnReply {
        let Some(entry) = self.get_session(call_sid).await else {
            debug!("Follow-up for unknown or expired session");
            return TurnReply::Completed {
                spoken: REASSURANCE_SPOKEN.to_string(),
            };
        };

        let mut remove_after = false;
        let reply = {
            let mut session = entry.lock().await;
            session.state.touch();

            match session.state.phase {
                // Escalation is monotonic; any later turn hears the same line
                ConversationPhase::Escalated => TurnReply::Escalated {
                    spoken: session.state.escalated_spoken.clone(),
                },
                ConversationPhase::Completed => TurnReply::Completed {
                    spoken: REASSURANCE_SPOKEN.to_string(),
                },
                ConversationPhase::AwaitingFollowup => match parse_answer(transcript) {
                    FollowupAnswer::Yes => {
                        self.escalate(&mut session, transcript);
                        TurnReply::Escalated {
                            spoken: session.state.escalated_spoken.clone(),
                        }
                    }
                    FollowupAnswer::No => {
                        session.state.phase = ConversationPhase::Completed;
                        session.state.last_transcript = Some(transcript.trim().to_string());
                        session.state.last_spoken = Some(COMPLETED_SPOKEN.to_string());
                        session.record.status = CallStatus::Completed;
                        remove_after = true;
                        info!("Caller confirmed situation stable, completing call");
                        self.spawn_persist_update(session.record.clone());
                        TurnReply::Completed {
                            spoken: COMPLETED_SPOKEN.to_string(),
                        }
                    }
                    FollowupAnswer::Unclear => {
                        session.state.reasks += 1;
                        if session.state.reasks > self.config.max_reasks {
                            session.state.phase = ConversationPhase::Completed;
                            session.record.status = CallStatus::Completed;
                            remove_after = true;
                            warn!("Follow-up never resolved, completing with current severity");
                            self.spawn_persist_update(session.record.clone());
                            TurnReply::Completed {
                                spoken: UNCLEAR_GIVE_UP_SPOKEN.to_string(),
                            }
                        } else {
                            TurnReply::ReAsk {
                                spoken: REASK_SPOKEN.to_string(),
                                danger_question: session.state.danger_question.clone(),
                            }
                        }
                    }
                },
            }
        };

        if remove_after {
            self.sessions.write().await.remove(call_sid);
        }
        reply
    }

    /// Provider lifecycle callback; terminal states end the session
    #[instrument(skip(self), fields(call_sid = %call_sid))]
    pub async fn handle_status_callback(&self, call_sid: &str, provider_status: &str) {
        let terminal = matches!(
            provider_status,
            "completed" | "failed" | "busy" | "no-answer" | "canceled"
        );
        if !terminal {
            debug!(status = provider_status, "Non-terminal provider status");
            return;
        }

        info!(status = provider_status, "Call ended by provider");
        let removed = self.sessions.write().await.remove(call_sid);
        self.reprompts.write().await.remove(call_sid);

        if let Some(entry) = removed {
            let mut record = entry.lock().await.record.clone();
            if !record.status.is_terminal() {
                record.status = CallStatus::Completed;
                self.spawn_persist_update(record);
            }
        }
    }

    /// Evict sessions past the TTL or in a terminal phase
    pub async fn sweep(&self) {
        let ttl = self.config.ttl_seconds;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(session) => !(session.state.is_terminal() || session.state.is_expired(ttl)),
            // A locked session is mid-turn; never evict it
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        drop(sessions);

        let mut reprompts = self.reprompts.write().await;
        reprompts
            .retain(|_, state| (Utc::now() - state.last_attempt_at).num_seconds() <= ttl);
        drop(reprompts);

        if evicted > 0 {
            info!(evicted, "Swept expired sessions");
        }
    }

    /// Spawn the periodic sweeper task
    pub fn start_sweeper(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                manager.sweep().await;
            }
        });
    }

    async fn get_session(&self, call_sid: &str) -> Option<Arc<Mutex<CallSession>>> {
        self.sessions.read().await.get(call_sid).cloned()
    }

    async fn reprompt(&self, call_sid: &str) -> TurnReply {
        let mut reprompts = self.reprompts.write().await;
        let state = reprompts.entry(call_sid.to_string()).or_insert(RepromptState {
            count: 0,
            last_attempt_at: Utc::now(),
        });
        state.count += 1;
        state.last_attempt_at = Utc::now();

        if state.count > self.config.max_reprompts {
            reprompts.remove(call_sid);
            warn!("Caller never produced a usable utterance, giving up");
            return TurnReply::Completed {
                spoken: GIVE_UP_SPOKEN.to_string(),
            };
        }

        self.metrics.calls_reprompted.inc();
        debug!(attempt = state.count, "Utterance too short, re-prompting");
        TurnReply::Reprompt {
            spoken: REPROMPT_SPOKEN.to_string(),
        }
    }

    /// Monotonic escalation: critical severity, top priority, never undone
    fn escalate(&self, session: &mut CallSession, transcript: &str) {
        session.state.escalate();
        session.state.last_transcript = Some(transcript.trim().to_string());
        session.state.last_spoken = Some(session.state.escalated_spoken.clone());

        let critical_floor = self.engine.thresholds().critical;
        let triage = &mut session.record.triage;
        triage.severity_level = SeverityLevel::Level1;
        triage.severity_score = triage.severity_score.max(critical_floor);
        triage.priority = 1;
        triage.spoken = session.state.escalated_spoken.clone();
        session.record.status = CallStatus::Escalated;

        self.metrics.calls_escalated.inc();
        info!("Severity escalated to critical on caller confirmation");
        self.spawn_persist_update(session.record.clone());
    }

    fn observe(&self, outcome: &TriageResult) {
        self.metrics
            .calls_processed
            .with_label_values(&[outcome.emergency_type.as_str()])
            .inc();
        self.metrics
            .processing_seconds
            .observe(outcome.processing_time_ms / 1000.0);
        if outcome.risk_indicators.iter().any(|tag| tag == "system_error") {
            self.metrics.degraded_outcomes.inc();
        }
    }

    /// Persist and broadcast a fresh call off the response path
    fn spawn_persist_new(&self, record: CallRecord) {
        let repository = self.repository.clone();
        let hub = self.hub.clone();
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            let snapshot = match repository {
                Some(repo) => match repo.upsert_call(&record).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        metrics.persistence_failures.inc();
                        warn!(call_sid = %record.call_sid, error = %e, "Dropping call persistence");
                        record
                    }
                },
                None => record,
            };
            if hub.publish(CallEvent::NewCall(Box::new(snapshot))).is_err() {
                metrics.broadcast_drops.inc();
            }
        });
    }

    /// Persist and broadcast a lifecycle change off the response path
    fn spawn_persist_update(&self, record: CallRecord) {
        let repository = self.repository.clone();
        let hub = self.hub.clone();
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            let snapshot = match repository {
                Some(repo) => match repo.upsert_call(&record).await {
                    Ok(stored) => stored,
                    Err(e) => {
                        metrics.persistence_failures.inc();
                        warn!(call_sid = %record.call_sid, error = %e, "Dropping call update persistence");
                        record
                    }
                },
                None => record,
            };
            let update = CallEvent::CallUpdate(CallUpdatePayload {
                call_sid: snapshot.call_sid.clone(),
                status: snapshot.status,
                assigned_unit: snapshot.assigned_unit.clone(),
                updated_at: snapshot.updated_at.unwrap_or_else(Utc::now),
            });
            if hub.publish(update).is_err() {
                metrics.broadcast_drops.inc();
            }
        });
    }

    /// Rolling-window counters for the dashboard
    pub async fn stats_snapshot(&self) -> StatsSnapshot {
        let Some(repository) = &self.repository else {
            return StatsSnapshot::default();
        };
        match repository.list_recent(24).await {
            Ok(calls) => StatsSnapshot {
                total_calls: calls.len() as i64,
                pending_calls: calls
                    .iter()
                    .filter(|c| c.status == CallStatus::Pending)
                    .count() as i64,
                in_progress_calls: calls
                    .iter()
                    .filter(|c| {
                        matches!(c.status, CallStatus::InProgress | CallStatus::AwaitingFollowup)
                    })
                    .count() as i64,
                critical_calls: calls
                    .iter()
                    .filter(|c| c.triage.severity_level == SeverityLevel::Level1)
                    .count() as i64,
                escalated_calls: calls
                    .iter()
                    .filter(|c| c.status == CallStatus::Escalated)
                    .count() as i64,
            },
            Err(e) => {
                warn!(error = %e, "Stats snapshot unavailable");
                StatsSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::{BackendKind, TriageConfig};

    fn manager() -> Arc<SessionManager> {
        let triage_config = TriageConfig {
            backend: BackendKind::Rule,
            min_confidence: 0.7,
            severity_critical: 80.0,
            severity_high: 60.0,
            severity_moderate: 40.0,
        };
        let engine = Arc::new(TriageEngine::new(&triage_config, None, 3_000).unwrap());
        Arc::new(SessionManager::new(
            engine,
            None,
            BroadcastHub::new(16, true),
            Arc::new(TriageMetrics::new().unwrap()),
            SessionConfig {
                ttl_seconds: 600,
                speech_timeout_seconds: 5,
                max_reprompts: 2,
                max_reasks: 2,
            },
        ))
    }

    async fn first_turn(manager: &SessionManager, call_sid: &str, transcript: &str) -> TurnReply {
        manager
            .handle_first_turn(call_sid, "+15550001111", "+15559990000", transcript, serde_json::json!({}))
            .await
    }

    #[tokio::test]
    async fn test_short_utterance_reprompts_then_gives_up() {
        let manager = manager();
        for _ in 0..2 {
            let reply = first_turn(&manager, "CA1", "hm").await;
            assert!(matches!(reply, TurnReply::Reprompt { .. }));
        }
        let reply = first_turn(&manager, "CA1", "uh").await;
        assert!(matches!(reply, TurnReply::Completed { .. }));
    }

    #[tokio::test]
    async fn test_first_turn_opens_followup() {
        let manager = manager();
        let reply = first_turn(&manager, "CA2", "There's a massive fire in the apartment building!").await;
        match reply {
            TurnReply::AwaitFollowup { spoken, danger_question } => {
                assert!(spoken.starts_with("Help is coming"));
                assert_eq!(danger_question, "Is the fire spreading or are people trapped?");
            }
            other => panic!("unexpected reply {other:?}"),
        }
        assert_eq!(manager.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_yes_escalates_and_stays_escalated() {
        let manager = manager();
        first_turn(&manager, "CA3", "My husband is having severe chest pain and collapsed.").await;

        let reply = manager.handle_followup("CA3", "yes").await;
        match &reply {
            TurnReply::Escalated { spoken } => {
                assert!(spoken.contains("Priority increased to critical"));
            }
            other => panic!("unexpected reply {other:?}"),
        }

        let entry = manager.get_session("CA3").await.unwrap();
        {
            let session = entry.lock().await;
            assert_eq!(session.state.severity_level, SeverityLevel::Level1);
            assert_eq!(session.state.priority, 1);
            assert_eq!(session.record.triage.priority, 1);
            assert!(session.record.triage.severity_score >= 80.0);
            assert_eq!(session.record.status, CallStatus::Escalated);
        }

        // Monotonic: a later NO does not de-escalate
        let reply = manager.handle_followup("CA3", "no it's fine now").await;
        assert!(matches!(reply, TurnReply::Escalated { .. }));
        let session = entry.lock().await;
        assert_eq!(session.state.severity_level, SeverityLevel::Level1);
    }

    #[tokio::test]
    async fn test_no_completes_and_evicts() {
        let manager = manager();
        first_turn(&manager, "CA4", "There's a massive fire in the apartment building!").await;

        let reply = manager.handle_followup("CA4", "no, it's contained now").await;
        match reply {
            TurnReply::Completed { spoken } => assert!(spoken.contains("Help is on the way")),
            other => panic!("unexpected reply {other:?}"),
        }
        assert_eq!(manager.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_unclear_reasks_then_completes() {
        let manager = manager();
        first_turn(&manager, "CA5", "Someone broke in and they have a gun").await;

        for _ in 0..2 {
            let reply = manager.handle_followup("CA5", "purple monkey dishwasher").await;
            assert!(matches!(reply, TurnReply::ReAsk { .. }));
        }
        let reply = manager.handle_followup("CA5", "banana").await;
        assert!(matches!(reply, TurnReply::Completed { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_delivery_replays_identically() {
        let manager = manager();
        let transcript = "Multi-car crash on the highway, people trapped.";
        let first = first_turn(&manager, "CA6", transcript).await;
        let second = first_turn(&manager, "CA6", transcript).await;
        assert_eq!(first, second);
        assert_eq!(manager.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_followup_without_session_reassures() {
        let manager = manager();
        let reply = manager.handle_followup("CA404", "yes").await;
        assert!(matches!(reply, TurnReply::Completed { .. }));
    }

    #[tokio::test]
    async fn test_status_callback_evicts_session() {
        let manager = manager();
        first_turn(&manager, "CA7", "There's a fire in my kitchen right now").await;
        assert_eq!(manager.active_sessions().await, 1);

        manager.handle_status_callback("CA7", "completed").await;
        assert_eq!(manager.active_sessions().await, 0);

        // Non-terminal statuses leave the session alone
        first_turn(&manager, "CA8", "There's a fire in my kitchen right now").await;
        manager.handle_status_callback("CA8", "in-progress").await;
        assert_eq!(manager.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_sessions() {
        let manager = manager();
        first_turn(&manager, "CA9", "There's a fire in my kitchen right now").await;

        {
            let entry = manager.get_session("CA9").await.unwrap();
            let mut session = entry.lock().await;
            session.state.last_turn_at = Utc::now() - chrono::Duration::seconds(601);
        }
        manager.sweep().await;
        assert_eq!(manager.active_sessions().await, 0);
    }

    #[test]
    fn test_answer_parsing() {
        assert_eq!(parse_answer("yes"), FollowupAnswer::Yes);
        assert_eq!(parse_answer("Yeah, it's spreading!"), FollowupAnswer::Yes);
        assert_eq!(parse_answer("no, it's contained now"), FollowupAnswer::No);
        assert_eq!(parse_answer("we are fine"), FollowupAnswer::No);
        assert_eq!(parse_answer("banana"), FollowupAnswer::Unclear);
        assert_eq!(parse_answer(""), FollowupAnswer::Unclear);
        // Ambiguous answers escalate rather than close
        assert_eq!(parse_answer("no wait yes"), FollowupAnswer::Yes);
    }
}
