//! Test doubles shared by the use case tests.

use crate::ports::llm_gateway::{CallPurpose, LlmGateway, LlmRequest, LlmResponse, ProviderError};
use crate::ports::progress::ProgressNotifier;
use crate::ports::session_repository::{SessionRepository, StoreError};
use crate::ports::telemetry::{TelemetryEvent, TelemetrySink};
use async_trait::async_trait;
use roundtable_domain::{RoundPhase, Session, SessionId, SessionStatus, SufficiencyJudgment};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&LlmRequest, u32) -> Result<LlmResponse, ProviderError> + Send + Sync;

/// Gateway whose replies come from a closure.
///
/// The closure receives the request and the 1-based call number for the
/// request's (persona, purpose) pair.
pub(crate) struct ScriptedGateway {
    responder: Box<Responder>,
    requests: Mutex<Vec<LlmRequest>>,
    counters: Mutex<HashMap<(String, CallPurpose), u32>>,
    delay: Option<Duration>,
    in_flight: Option<(Arc<AtomicUsize>, Arc<AtomicUsize>)>,
}

impl ScriptedGateway {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest, u32) -> Result<LlmResponse, ProviderError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            counters: Mutex::new(HashMap::new()),
            delay: None,
            in_flight: None,
        }
    }

    /// Gateway answering every purpose with well-formed replies
    pub(crate) fn discussion(judge_score: f64) -> Self {
        Self::new(move |request, _| Ok(discussion_reply(request, judge_score, &[])))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Track the current and the peak number of concurrent calls
    pub(crate) fn with_in_flight_tracking(
        mut self,
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    ) -> Self {
        self.in_flight = Some((current, peak));
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, purpose: CallPurpose) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.purpose == purpose)
            .count()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let call = {
            let mut counters = self.counters.lock().unwrap();
            let counter = counters
                .entry((request.persona_id.clone(), request.purpose))
                .or_insert(0);
            *counter += 1;
            *counter
        };
        self.requests.lock().unwrap().push(request.clone());

        if let Some((current, peak)) = &self.in_flight {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((current, _)) = &self.in_flight {
            current.fetch_sub(1, Ordering::SeqCst);
        }

        (self.responder)(request, call)
    }
}

pub(crate) fn reply(text: impl Into<String>) -> LlmResponse {
    LlmResponse::new(text, "scripted-model")
}

pub(crate) fn statement_text(persona_id: &str) -> String {
    format!(
        "Speaking as {}.\n\nISSUES:\n1. Slow hiring pipeline\n\nSOLUTIONS:\n1. Referral program",
        persona_id
    )
}

pub(crate) fn judge_json(score: f64, recommended: &[&str]) -> String {
    json!({
        "overall_score": score,
        "category_coverage": {
            "talent_management": score,
            "process_improvement": score / 2.0,
        },
        "missing_areas": ["onboarding"],
        "recommended_personas": recommended,
        "reasoning": "scripted",
    })
    .to_string()
}

pub(crate) fn extraction_json() -> String {
    json!({
        "issues": [{
            "id": "I1",
            "title": "Slow hiring pipeline",
            "description": "Offers take six weeks",
            "category": "talent_management",
            "priority": "high",
            "root_causes": ["manual screening"],
        }],
        "solutions": [{
            "issue_id": "I1",
            "title": "Referral program",
            "implementation_steps": ["announce bonus"],
            "timeline": "1 month",
        }],
    })
    .to_string()
}

/// Well-formed reply for any purpose
pub(crate) fn discussion_reply(request: &LlmRequest, judge_score: f64, recommended: &[&str]) -> LlmResponse {
    match request.purpose {
        CallPurpose::Statement(RoundPhase::Consensus) => reply("We agree hiring is the bottleneck."),
        CallPurpose::Statement(RoundPhase::Summary) => reply("Summary: fix hiring first."),
        CallPurpose::Statement(_) => reply(statement_text(&request.persona_id)),
        CallPurpose::Judgment => reply(judge_json(judge_score, recommended)),
        CallPurpose::Extraction => reply(extraction_json()),
        CallPurpose::HealthCheck => reply("ok"),
    }
}

/// Session store kept in memory, with a switch to make saves fail
#[derive(Default)]
pub(crate) struct InMemorySessionRepository {
    sessions: Mutex<HashMap<SessionId, Session>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemorySessionRepository {
    pub(crate) fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn stored(&self, id: SessionId) -> Option<Session> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Other("disk full".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id(), session.clone());
        Ok(())
    }

    async fn load(&self, id: SessionId) -> Result<Session, StoreError> {
        self.stored(id).ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self.sessions.lock().unwrap().values().cloned().collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.created_at()));
        Ok(sessions)
    }

    async fn delete(&self, id: SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub(crate) struct RecordingTelemetry {
    events: Mutex<Vec<(&'static str, Value)>>,
}

impl RecordingTelemetry {
    pub(crate) fn events(&self) -> Vec<(&'static str, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn event_types(&self) -> Vec<&'static str> {
        self.events().into_iter().map(|(t, _)| t).collect()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}

/// Progress notifier that remembers what it was told
#[derive(Default)]
pub(crate) struct RecordingProgress {
    pub(crate) statuses: Mutex<Vec<SessionStatus>>,
    pub(crate) phases: Mutex<Vec<RoundPhase>>,
    pub(crate) failed_tasks: Mutex<Vec<(RoundPhase, String)>>,
    pub(crate) judgments: Mutex<Vec<u32>>,
}

impl ProgressNotifier for RecordingProgress {
    fn on_phase_start(&self, phase: RoundPhase, _total_tasks: usize) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_task_complete(&self, phase: RoundPhase, persona: &str, success: bool) {
        if !success {
            self.failed_tasks
                .lock()
                .unwrap()
                .push((phase, persona.to_string()));
        }
    }

    fn on_phase_complete(&self, _phase: RoundPhase) {}

    fn on_judgment(&self, judgment: &SufficiencyJudgment) {
        self.judgments.lock().unwrap().push(judgment.round_id);
    }

    fn on_status_change(&self, status: SessionStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}
