//! Discussion configuration from TOML (`[discussion]` and `[invocation]` sections)

use roundtable_application::DiscussionParams;
use roundtable_domain::COORDINATOR_ID;
use roundtable_domain::validation::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for `discussion.max_rounds`
pub const MAX_ROUNDS_LIMIT: u32 = 5;

/// Round-loop settings
///
/// ```toml
/// [discussion]
/// max_rounds = 3
/// sufficiency_threshold = 75
/// participants = ["tech_lead", "scrum_master"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscussionConfig {
    pub max_rounds: u32,
    pub sufficiency_threshold: f64,
    /// Provider calls allowed in flight at once
    pub max_concurrency: usize,
    /// Initial participants; empty means every basic persona
    pub participants: Vec<String>,
    pub moderator: String,
    pub judge: String,
    pub analyst: String,
    /// Fail the session when the judge cannot be consulted instead of stopping
    pub escalate_judgment_failure: bool,
}

impl Default for FileDiscussionConfig {
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
        }
    }
}

impl FileDiscussionConfig {
    pub(super) fn range_issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if !(1..=MAX_ROUNDS_LIMIT).contains(&self.max_rounds) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "discussion.max_rounds".to_string(),
                    value: self.max_rounds as f64,
                },
                format!(
                    "discussion.max_rounds: {} is outside 1..={}",
                    self.max_rounds, MAX_ROUNDS_LIMIT
                ),
            ));
        }

        if !(0.0..=100.0).contains(&self.sufficiency_threshold) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "discussion.sufficiency_threshold".to_string(),
                    value: self.sufficiency_threshold,
                },
                format!(
                    "discussion.sufficiency_threshold: {} is outside 0..=100",
                    self.sufficiency_threshold
                ),
            ));
        }

        if self.max_concurrency == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "discussion.max_concurrency".to_string(),
                    value: 0.0,
                },
                "discussion.max_concurrency: must allow at least one call in flight",
            ));
        }

        issues
    }
}

/// Backoff between retry attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInvocationConfig {
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for FileInvocationConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
        }
    }
}

/// Build the application-level parameters from the two sections.
pub fn to_discussion_params(
    discussion: &FileDiscussionConfig,
    invocation: &FileInvocationConfig,
) -> DiscussionParams {
    DiscussionParams::default()
        .with_max_rounds(discussion.max_rounds)
        .with_sufficiency_threshold(discussion.sufficiency_threshold)
        .with_max_concurrency(discussion.max_concurrency)
        .with_participants(discussion.participants.clone())
        .with_moderator(discussion.moderator.clone())
        .with_judge(discussion.judge.clone())
        .with_analyst(discussion.analyst.clone())
        .with_escalate_judgment_failure(discussion.escalate_judgment_failure)
        .with_backoff(
            Duration::from_millis(invocation.backoff_base_ms),
            Duration::from_millis(invocation.backoff_max_ms.max(invocation.backoff_base_ms)),
        )
}
