//! Session aggregate root

use super::judgment::SufficiencyJudgment;
use super::org_context::OrgContext;
use super::round::Round;
use super::statement::Statement;
use super::status::{SessionStatus, TransitionError};
use crate::core::error::DomainError;
use crate::findings::entities::{IdentifiedIssue, ProposedSolution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One deliberation from topic to findings (Aggregate Root)
///
/// Mutated only by the coordinator and the round controller. Every status
/// change goes through [`Session::transition`], which enforces the state
/// machine in [`SessionStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    topic: String,
    #[serde(default)]
    org_context: OrgContext,
    status: SessionStatus,
    #[serde(default)]
    rounds: Vec<Round>,
    #[serde(default)]
    judgments: Vec<SufficiencyJudgment>,
    #[serde(default)]
    final_issues: Vec<IdentifiedIssue>,
    #[serde(default)]
    final_solutions: Vec<ProposedSolution>,
    #[serde(default)]
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(topic: impl Into<String>, org_context: OrgContext) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            topic: topic.into(),
            org_context,
            status: SessionStatus::Initialized,
            rounds: Vec::new(),
            judgments: Vec::new(),
            final_issues: Vec::new(),
            final_solutions: Vec::new(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn org_context(&self) -> &OrgContext {
        &self.org_context
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn judgments(&self) -> &[SufficiencyJudgment] {
        &self.judgments
    }

    pub fn final_issues(&self) -> &[IdentifiedIssue] {
        &self.final_issues
    }

    pub fn final_solutions(&self) -> &[ProposedSolution] {
        &self.final_solutions
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn round_count(&self) -> u32 {
        self.rounds.len() as u32
    }

    /// The most recently started round
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn round(&self, id: u32) -> Option<&Round> {
        id.checked_sub(1).and_then(|i| self.rounds.get(i as usize))
    }

    pub fn round_mut(&mut self, id: u32) -> Option<&mut Round> {
        let index = id.checked_sub(1)? as usize;
        self.rounds.get_mut(index)
    }

    pub fn judgment_for(&self, round_id: u32) -> Option<&SufficiencyJudgment> {
        self.judgments.iter().find(|j| j.round_id == round_id)
    }

    pub fn latest_judgment(&self) -> Option<&SufficiencyJudgment> {
        self.judgments.last()
    }

    /// Every statement of every round, in recording order
    pub fn all_statements(&self) -> impl Iterator<Item = &Statement> {
        self.rounds.iter().flat_map(|r| r.statements.iter())
    }

    /// Union of participants over all rounds, first appearance first
    pub fn all_participants(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rounds
            .iter()
            .flat_map(|r| r.participants.iter())
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }

    // ==================== Mutations ====================

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Apply a status transition.
    ///
    /// Returns `Ok(false)` when the session is already in `next`.
    pub fn transition(&mut self, next: SessionStatus) -> Result<bool, TransitionError> {
        let changed = self.status.check_transition(next)?;
        if changed {
            self.status = next;
            if next.is_terminal() {
                self.completed_at = Some(Utc::now());
            }
            self.touch();
        }
        Ok(changed)
    }

    /// Start the next round and move to `RoundInProgress` for it.
    ///
    /// Round ids are assigned contiguously from 1. Legal only from
    /// `Initialized` or from `Judging(n)` where `n` is the last round.
    pub fn begin_round(
        &mut self,
        participants: Vec<String>,
        moderator: impl Into<String>,
    ) -> Result<&mut Round, DomainError> {
        let id = self.round_count() + 1;
        self.status.check_transition(SessionStatus::RoundInProgress(id))?;
        if let Some(last) = self.rounds.last()
            && !last.is_completed()
        {
            return Err(DomainError::InvariantViolated(format!(
                "round {} must complete before round {} starts",
                last.id, id
            )));
        }
        let round = Round::new(id, participants, moderator)?;
        self.rounds.push(round);
        self.transition(SessionStatus::RoundInProgress(id))?;
        let index = self.rounds.len() - 1;
        Ok(&mut self.rounds[index])
    }

    /// Record the judgment for a completed round. At most one per round.
    pub fn record_judgment(&mut self, judgment: SufficiencyJudgment) -> Result<(), DomainError> {
        let round_id = judgment.round_id;
        let round = self
            .round(round_id)
            .ok_or(DomainError::UnknownRound(round_id))?;
        if !round.is_completed() {
            return Err(DomainError::InvariantViolated(format!(
                "round {} is not completed and cannot be judged",
                round_id
            )));
        }
        if self.judgment_for(round_id).is_some() {
            return Err(DomainError::DuplicateJudgment(round_id));
        }
        self.judgments.push(judgment);
        self.touch();
        Ok(())
    }

    /// Store the final findings and complete the session.
    ///
    /// Solutions must already reference recorded issues; see
    /// [`crate::findings::merge::drop_orphans`].
    pub fn complete_with(
        &mut self,
        issues: Vec<IdentifiedIssue>,
        solutions: Vec<ProposedSolution>,
    ) -> Result<(), DomainError> {
        let ids: BTreeSet<&str> = issues.iter().map(|i| i.id.as_str()).collect();
        if let Some(orphan) = solutions.iter().find(|s| !ids.contains(s.issue_id.as_str())) {
            return Err(DomainError::InvariantViolated(format!(
                "solution {} references unknown issue {}",
                orphan.id, orphan.issue_id
            )));
        }
        if !self.status.check_transition(SessionStatus::Completed)? {
            return Err(DomainError::InvariantViolated(
                "findings of a completed session are final".to_string(),
            ));
        }
        self.final_issues = issues;
        self.final_solutions = solutions;
        self.transition(SessionStatus::Completed)?;
        Ok(())
    }

    /// Move to `Failed`, keeping every round and judgment for audit.
    ///
    /// An open round is marked failed with the same reason. Returns
    /// `Ok(false)` when the session had already failed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<bool, TransitionError> {
        if self.status == SessionStatus::Failed {
            return Ok(false);
        }
        self.status.check_transition(SessionStatus::Failed)?;
        let reason = reason.into();
        if let Some(round) = self.rounds.last_mut()
            && !round.is_closed()
        {
            round.fail(reason.clone());
        }
        self.failure_reason = Some(reason);
        self.transition(SessionStatus::Failed)
    }

    // ==================== Invariants ====================

    /// Verify the structural invariants of the aggregate
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let violation = |msg: String| Err(DomainError::InvariantViolated(msg));

        for (i, round) in self.rounds.iter().enumerate() {
            if round.id != i as u32 + 1 {
                return violation(format!("round at index {} has id {}", i, round.id));
            }
            if let Some(stmt) = round
                .statements
                .iter()
                .find(|s| !round.is_participant(&s.persona_id))
            {
                return violation(format!(
                    "statement by '{}' in round {} from a non-participant",
                    stmt.persona_id, round.id
                ));
            }
        }

        if self.status.is_terminal() != self.completed_at.is_some() {
            return violation(format!(
                "completed_at must be set iff status is terminal (status {})",
                self.status
            ));
        }

        if let Some(n) = self.status.round()
            && n != self.round_count()
        {
            return violation(format!(
                "status {} does not match {} recorded rounds",
                self.status,
                self.round_count()
            ));
        }

        for judgment in &self.judgments {
            if self.round(judgment.round_id).is_none() {
                return violation(format!("judgment for unknown round {}", judgment.round_id));
            }
        }

        let ids: BTreeSet<&str> = self.final_issues.iter().map(|i| i.id.as_str()).collect();
        if let Some(orphan) = self
            .final_solutions
            .iter()
            .find(|s| !ids.contains(s.issue_id.as_str()))
        {
            return violation(format!(
                "solution {} references unknown issue {}",
                orphan.id, orphan.issue_id
            ));
        }

        Ok(())
    }
}
