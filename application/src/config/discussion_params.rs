//! Discussion parameters: round loop control.
//!
//! [`DiscussionParams`] groups the static parameters that control the
//! coordinator's round loop and the invocation gateway's retry pacing.
//! Per-persona timeouts and attempt counts live on
//! [`LlmSettings`](roundtable_domain::LlmSettings) instead.

use roundtable_domain::{COORDINATOR_ID, ConvergencePolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Round loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionParams {
    /// Hard cap on rounds per session.
    pub max_rounds: u32,
    /// Score at or above which the judge's verdict stops the loop.
    pub sufficiency_threshold: f64,
    /// Maximum simultaneous in-flight provider calls.
    pub max_concurrency: usize,
    /// Participants of the first round. Empty means the catalog defaults.
    pub participants: Vec<String>,
    /// Persona that writes consensus and summary.
    pub moderator: String,
    /// Persona that scores sufficiency.
    pub judge: String,
    /// Persona that extracts structured findings.
    pub analyst: String,
    /// Fail the session when the judge cannot be consulted, instead of stopping.
    pub escalate_judgment_failure: bool,
    /// First retry delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Upper bound on a single retry delay.
    pub backoff_max: Duration,
}

impl Default for DiscussionParams {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            sufficiency_threshold: 75.0,
            max_concurrency: 4,
            participants: Vec::new(),
            moderator: COORDINATOR_ID.to_string(),
            judge: COORDINATOR_ID.to_string(),
            analyst: COORDINATOR_ID.to_string(),
            escalate_judgment_failure: false,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
        }
    }
}

impl DiscussionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    pub fn with_sufficiency_threshold(mut self, threshold: f64) -> Self {
        self.sufficiency_threshold = threshold;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = participants.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_moderator(mut self, id: impl Into<String>) -> Self {
        self.moderator = id.into();
        self
    }

    pub fn with_judge(mut self, id: impl Into<String>) -> Self {
        self.judge = id.into();
        self
    }

    pub fn with_analyst(mut self, id: impl Into<String>) -> Self {
        self.analyst = id.into();
        self
    }

    pub fn with_escalate_judgment_failure(mut self, escalate: bool) -> Self {
        self.escalate_judgment_failure = escalate;
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    pub fn policy(&self) -> ConvergencePolicy {
        ConvergencePolicy::new(self.sufficiency_threshold, self.max_rounds)
    }
}
