//! Run Discussion use case
//!
//! The [`DiscussionCoordinator`] owns the session lifecycle. It starts
//! rounds, consults the sufficiency judge, decides between another round and
//! analysis, and finalizes the structured findings.
//!
//! # Persistence
//!
//! Every change to the session is saved before it is reported. The
//! coordinator snapshots the session, applies the change, then saves. If
//! the save fails, the in-memory session is restored to the snapshot and the
//! store error is returned, so memory never runs ahead of what is durable.
//!
//! # Failure outcomes
//!
//! A moderator failure, an escalated judgment failure, an extraction
//! failure or cancellation drive the session to `Failed` with a reason. The
//! rounds and judgments recorded up to that point are kept.

use crate::config::DiscussionParams;
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::session_repository::{SessionRepository, StoreError};
use crate::use_cases::extract_findings::{ExtractionError, FindingsExtractor};
use crate::use_cases::invocation::InvocationGateway;
use crate::use_cases::judge_sufficiency::{JudgmentError, SufficiencyJudge};
use crate::use_cases::run_round::{RoundBrief, RoundController, RoundError};
use roundtable_domain::{
    DomainError, IdentifiedIssue, OrgContext, PersonaCatalog, ProposedSolution, Round, Session,
    SessionId, SessionStatus, SufficiencyJudgment, TransitionError, drop_orphans,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure reason recorded when a discussion is cancelled
pub const CANCELLED_REASON: &str = "cancelled";

/// Errors surfaced by the coordinator
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("State conflict: {0}")]
    StateConflict(#[from] TransitionError),

    #[error("Domain error: {0}")]
    Domain(DomainError),

    #[error(transparent)]
    Round(RoundError),

    #[error(transparent)]
    Judgment(#[from] JudgmentError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown {role} persona '{id}'")]
    UnknownPersona { role: &'static str, id: String },

    #[error("max_rounds must be at least 1")]
    NoRoundsAllowed,

    #[error("Discussion cancelled")]
    Cancelled,
}

impl From<DomainError> for CoordinatorError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Transition(conflict) => CoordinatorError::StateConflict(conflict),
            other => CoordinatorError::Domain(other),
        }
    }
}

impl From<RoundError> for CoordinatorError {
    fn from(error: RoundError) -> Self {
        match error {
            RoundError::Cancelled => CoordinatorError::Cancelled,
            RoundError::Domain(domain) => domain.into(),
            other => CoordinatorError::Round(other),
        }
    }
}

impl CoordinatorError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoordinatorError::StateConflict(_))
    }
}

/// What to do next to settle recorded facts
enum Settle {
    To(SessionStatus),
    Fail(String),
    Done,
}

/// Drives a session from `Initialized` to a terminal status
pub struct DiscussionCoordinator<G: LlmGateway + 'static> {
    rounds: RoundController<G>,
    judge: SufficiencyJudge<G>,
    extractor: FindingsExtractor<G>,
    invoker: InvocationGateway<G>,
    catalog: Arc<PersonaCatalog>,
    store: Arc<dyn SessionRepository>,
    params: DiscussionParams,
    progress: Arc<dyn ProgressNotifier>,
}

impl<G: LlmGateway + 'static> DiscussionCoordinator<G> {
    pub fn new(
        invoker: InvocationGateway<G>,
        catalog: Arc<PersonaCatalog>,
        store: Arc<dyn SessionRepository>,
        params: DiscussionParams,
    ) -> Result<Self, CoordinatorError> {
        if params.max_rounds == 0 {
            return Err(CoordinatorError::NoRoundsAllowed);
        }
        for (role, id) in [
            ("moderator", &params.moderator),
            ("judge", &params.judge),
            ("analyst", &params.analyst),
        ] {
            if !catalog.contains(id) {
                return Err(CoordinatorError::UnknownPersona {
                    role,
                    id: id.clone(),
                });
            }
        }

        Ok(Self {
            rounds: RoundController::new(invoker.clone(), Arc::clone(&catalog)),
            judge: SufficiencyJudge::new(
                invoker.clone(),
                Arc::clone(&catalog),
                params.judge.clone(),
                params.policy(),
            )
            .with_escalation(params.escalate_judgment_failure),
            extractor: FindingsExtractor::new(
                invoker.clone(),
                Arc::clone(&catalog),
                params.analyst.clone(),
            ),
            invoker,
            catalog,
            store,
            params,
            progress: Arc::new(NoProgress),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn params(&self) -> &DiscussionParams {
        &self.params
    }

    // ==================== Entry Points ====================

    /// Create a session for `topic` and run it to a terminal status.
    ///
    /// A session that ends `Failed` is returned normally; `Err` is reserved
    /// for conflicts and persistence failures.
    pub async fn run_discussion(
        &self,
        topic: impl Into<String>,
        org_context: OrgContext,
    ) -> Result<Session, CoordinatorError> {
        let mut session = Session::new(topic, org_context);
        self.store.save(&session).await?;
        info!(session = %session.id(), topic = %session.topic(), "Discussion created");

        self.run(&mut session).await?;
        Ok(session)
    }

    /// Load a stored session and continue it from its last saved status
    pub async fn resume(&self, id: SessionId) -> Result<Session, CoordinatorError> {
        let mut session = self.store.load(id).await?;
        info!(session = %id, status = %session.status(), "Resuming discussion");
        self.run(&mut session).await?;
        Ok(session)
    }

    /// Drive `session` until it reaches `Completed` or `Failed`.
    pub async fn run(&self, session: &mut Session) -> Result<SessionStatus, CoordinatorError> {
        loop {
            match self.step(session).await {
                Ok(true) => {}
                Ok(false) => return Ok(session.status()),
                Err(e) if session.status() == SessionStatus::Failed => {
                    debug!(session = %session.id(), "Discussion ended in failure: {}", e);
                    return Ok(SessionStatus::Failed);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Perform the next unit of work. Returns false once the session is terminal.
    async fn step(&self, session: &mut Session) -> Result<bool, CoordinatorError> {
        self.ensure_not_cancelled(session).await?;

        match self.advance(session).await? {
            SessionStatus::Initialized => {
                let participants = self.initial_participants();
                self.start_round(session, &participants).await?;
            }
            SessionStatus::RoundInProgress(n) => {
                let participants = session
                    .round(n)
                    .map(|r| r.participants.clone())
                    .unwrap_or_default();
                self.start_round(session, &participants).await?;
            }
            SessionStatus::Judging(n) => {
                if session.judgment_for(n).is_none() {
                    self.evaluate_sufficiency(session, n).await?;
                } else {
                    let participants = self.next_participants(session);
                    self.start_round(session, &participants).await?;
                }
            }
            SessionStatus::Analyzing => self.analyze(session).await?,
            SessionStatus::Completed | SessionStatus::Failed => return Ok(false),
        }
        Ok(true)
    }

    // ==================== Operations ====================

    /// Start (or re-run) a round and drive it through all five phases.
    ///
    /// - From `Initialized`, or from `Judging(n)` whose judgment asks for
    ///   more, round `n + 1` is created with `participants`.
    /// - In `RoundInProgress(n)` with round `n` still open, the round's
    ///   partial output is discarded and it runs again with its original
    ///   participants.
    /// - In `RoundInProgress(n)` with round `n` already completed, this is a
    ///   no-op that returns the round.
    pub async fn start_round(
        &self,
        session: &mut Session,
        participants: &[String],
    ) -> Result<Round, CoordinatorError> {
        self.ensure_not_cancelled(session).await?;

        let status = session.status();
        let round_id = match status {
            SessionStatus::Initialized | SessionStatus::Judging(_) => {
                if let SessionStatus::Judging(n) = status {
                    let wants_more = session
                        .judgment_for(n)
                        .is_some_and(|j| j.needs_additional_round);
                    if !wants_more || n >= self.params.max_rounds {
                        return Err(TransitionError {
                            from: status,
                            to: SessionStatus::RoundInProgress(n + 1),
                        }
                        .into());
                    }
                }
                let participants = self.catalog.resolve(participants);
                let checkpoint = session.clone();
                let id = session
                    .begin_round(participants, self.params.moderator.clone())?
                    .id;
                self.commit(session, checkpoint).await?;
                self.progress.on_status_change(session.status());
                id
            }
            SessionStatus::RoundInProgress(n) => {
                let round = session.round_mut(n).ok_or(DomainError::UnknownRound(n))?;
                if round.is_completed() {
                    debug!(round = n, "Round already completed");
                    return Ok(round.clone());
                }
                info!(round = n, "Re-running interrupted round");
                round.reset()?;
                n
            }
            other => {
                return Err(TransitionError {
                    from: other,
                    to: SessionStatus::RoundInProgress(session.round_count() + 1),
                }
                .into());
            }
        };

        let checkpoint = session.clone();
        let topic = session.topic().to_string();
        let org_context = session.org_context().clone();
        let focus_areas: Vec<String> = round_id
            .checked_sub(1)
            .and_then(|prev| session.judgment_for(prev))
            .map(|j| j.missing_areas.clone())
            .unwrap_or_default();

        let round = session
            .round_mut(round_id)
            .ok_or(DomainError::UnknownRound(round_id))?;
        let brief = RoundBrief {
            topic: &topic,
            org_context: &org_context,
            focus_areas: &focus_areas,
        };
        let result = self.rounds.run(round, brief, self.progress.as_ref()).await;

        match result {
            Ok(()) => {
                self.commit(session, checkpoint).await?;
                session
                    .round(round_id)
                    .cloned()
                    .ok_or_else(|| DomainError::UnknownRound(round_id).into())
            }
            Err(RoundError::Cancelled) => {
                self.fail_session(session, CANCELLED_REASON).await?;
                Err(CoordinatorError::Cancelled)
            }
            Err(e) => {
                self.fail_session(session, e.to_string()).await?;
                Err(e.into())
            }
        }
    }

    /// Judge round `round_id` and record the judgment.
    ///
    /// Idempotent: a round that already has a judgment gets it back without
    /// another judge call.
    pub async fn evaluate_sufficiency(
        &self,
        session: &mut Session,
        round_id: u32,
    ) -> Result<SufficiencyJudgment, CoordinatorError> {
        if let Some(existing) = session.judgment_for(round_id) {
            return Ok(existing.clone());
        }

        let status = self.advance(session).await?;
        if status != SessionStatus::Judging(round_id) {
            return Err(TransitionError {
                from: status,
                to: SessionStatus::Judging(round_id),
            }
            .into());
        }
        self.ensure_not_cancelled(session).await?;

        match self.judge.judge(session, round_id).await {
            Ok(judgment) => {
                let checkpoint = session.clone();
                session.record_judgment(judgment.clone())?;
                self.commit(session, checkpoint).await?;
                self.progress.on_judgment(&judgment);
                Ok(judgment)
            }
            Err(JudgmentError::Cancelled) => {
                self.fail_session(session, CANCELLED_REASON).await?;
                Err(CoordinatorError::Cancelled)
            }
            Err(e) => {
                self.fail_session(session, e.to_string()).await?;
                Err(e.into())
            }
        }
    }

    /// Apply every status transition already justified by recorded facts.
    ///
    /// Makes no external calls and is idempotent: applied to a session with
    /// nothing left to settle, it returns the current status unchanged.
    pub async fn advance(&self, session: &mut Session) -> Result<SessionStatus, CoordinatorError> {
        loop {
            let settle = match session.status() {
                SessionStatus::RoundInProgress(n) => match session.round(n) {
                    Some(round) if round.is_completed() => Settle::To(SessionStatus::Judging(n)),
                    Some(round) if round.is_failed() => {
                        Settle::Fail(round.failure.clone().unwrap_or_default())
                    }
                    _ => Settle::Done,
                },
                SessionStatus::Judging(n) => match session.judgment_for(n) {
                    Some(j) if !j.needs_additional_round || n >= self.params.max_rounds => {
                        Settle::To(SessionStatus::Analyzing)
                    }
                    _ => Settle::Done,
                },
                _ => Settle::Done,
            };

            match settle {
                Settle::To(next) => self.apply(session, next).await?,
                Settle::Fail(reason) => self.fail_session(session, reason).await?,
                Settle::Done => return Ok(session.status()),
            }
        }
    }

    /// Extract structured findings from every completed round and finalize.
    pub async fn analyze(&self, session: &mut Session) -> Result<(), CoordinatorError> {
        let status = self.advance(session).await?;
        if status != SessionStatus::Analyzing {
            return Err(TransitionError {
                from: status,
                to: SessionStatus::Analyzing,
            }
            .into());
        }
        self.ensure_not_cancelled(session).await?;

        match self.extractor.extract(session).await {
            Ok(findings) => {
                self.finalize(session, findings.issues, findings.solutions)
                    .await
            }
            Err(ExtractionError::Cancelled) => {
                self.fail_session(session, CANCELLED_REASON).await?;
                Err(CoordinatorError::Cancelled)
            }
            Err(e) => {
                self.fail_session(session, e.to_string()).await?;
                Err(e.into())
            }
        }
    }

    /// Store the findings and complete the session.
    ///
    /// Solutions referencing an issue not in `issues` are dropped with a
    /// warning. A session that is already completed is left untouched.
    pub async fn finalize(
        &self,
        session: &mut Session,
        issues: Vec<IdentifiedIssue>,
        solutions: Vec<ProposedSolution>,
    ) -> Result<(), CoordinatorError> {
        if session.status() == SessionStatus::Completed {
            return Ok(());
        }

        let (solutions, orphans) = drop_orphans(&issues, solutions);
        for orphan in &orphans {
            warn!(
                solution = %orphan.id,
                issue = %orphan.issue_id,
                "Dropping solution that references an unknown issue"
            );
        }

        let checkpoint = session.clone();
        session.complete_with(issues, solutions)?;
        self.commit(session, checkpoint).await?;
        self.progress.on_status_change(SessionStatus::Completed);
        info!(
            session = %session.id(),
            rounds = session.round_count(),
            issues = session.final_issues().len(),
            solutions = session.final_solutions().len(),
            "Discussion completed"
        );
        Ok(())
    }

    // ==================== Participants ====================

    /// First-round participants: the configured ids, or the catalog defaults
    pub fn initial_participants(&self) -> Vec<String> {
        if self.params.participants.is_empty() {
            self.catalog.default_participants()
        } else {
            self.catalog.resolve(&self.params.participants)
        }
    }

    /// Participants of the next round: the current ones plus any persona the
    /// latest judgment recommended.
    pub fn next_participants(&self, session: &Session) -> Vec<String> {
        let current: Vec<String> = session
            .current_round()
            .map(|r| r.participants.clone())
            .unwrap_or_else(|| self.initial_participants());
        match session.latest_judgment() {
            Some(judgment) => self
                .catalog
                .extend_participants(&current, &judgment.recommended_personas),
            None => current,
        }
    }

    // ==================== State Helpers ====================

    async fn commit(&self, session: &mut Session, checkpoint: Session) -> Result<(), CoordinatorError> {
        if let Err(e) = self.store.save(session).await {
            warn!(session = %session.id(), "Save failed, rolling back: {}", e);
            *session = checkpoint;
            return Err(e.into());
        }
        Ok(())
    }

    async fn apply(&self, session: &mut Session, next: SessionStatus) -> Result<(), CoordinatorError> {
        let checkpoint = session.clone();
        if session.transition(next)? {
            self.commit(session, checkpoint).await?;
            info!(session = %session.id(), status = %next, "Status changed");
            self.progress.on_status_change(next);
        }
        Ok(())
    }

    async fn fail_session(
        &self,
        session: &mut Session,
        reason: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        let reason = reason.into();
        let checkpoint = session.clone();
        if session.fail(reason.clone())? {
            self.commit(session, checkpoint).await?;
            warn!(session = %session.id(), "Discussion failed: {}", reason);
            self.progress.on_status_change(SessionStatus::Failed);
        }
        Ok(())
    }

    async fn ensure_not_cancelled(&self, session: &mut Session) -> Result<(), CoordinatorError> {
        if self.invoker.is_cancelled() && !session.status().is_terminal() {
            self.fail_session(session, CANCELLED_REASON).await?;
            return Err(CoordinatorError::Cancelled);
        }
        Ok(())
    }
}
