//! Run Round use case
//!
//! Drives one round through its five phases:
//!
//! 1. **Initial**: every participant states a view independently (parallel)
//! 2. **Interactive 1**: participants react to what was said (parallel)
//! 3. **Interactive 2**: participants converge and prioritize (parallel)
//! 4. **Consensus**: the moderator synthesizes agreement and disagreement
//! 5. **Summary**: the moderator writes an executive summary
//!
//! Within a fan-out phase every participant sees the same snapshot of the
//! round's history as it stood when the phase began, and statements are
//! recorded in participant order regardless of completion order. A failed
//! participant call degrades into a placeholder statement; a failed
//! moderator call fails the round.

use crate::ports::llm_gateway::{CallPurpose, LlmGateway, ProviderError};
use crate::ports::progress::ProgressNotifier;
use crate::use_cases::invocation::{InvocationGateway, PromptContext};
use roundtable_domain::{
    DomainError, OrgContext, PersonaCatalog, PersonaProfile, PromptTemplate, Round, RoundPhase,
    Statement, Synthesis,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors that end a round early
#[derive(Error, Debug)]
pub enum RoundError {
    #[error("Round {round} failed in {phase} phase: moderator '{persona}' could not respond: {source}")]
    ModeratorFailed {
        round: u32,
        phase: RoundPhase,
        persona: String,
        #[source]
        source: ProviderError,
    },

    #[error("Moderator '{0}' is not in the persona catalog")]
    UnknownModerator(String),

    #[error("Round cancelled")]
    Cancelled,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What a round discusses
#[derive(Debug, Clone, Copy)]
pub struct RoundBrief<'a> {
    pub topic: &'a str,
    pub org_context: &'a OrgContext,
    /// Under-explored areas carried over from the previous judgment
    pub focus_areas: &'a [String],
}

/// Runs the five phases of a round
pub struct RoundController<G: LlmGateway + 'static> {
    invoker: InvocationGateway<G>,
    catalog: Arc<PersonaCatalog>,
}

impl<G: LlmGateway + 'static> RoundController<G> {
    pub fn new(invoker: InvocationGateway<G>, catalog: Arc<PersonaCatalog>) -> Self {
        Self { invoker, catalog }
    }

    /// Execute every phase of an open round and complete it.
    ///
    /// On a moderator failure the round is marked failed before the error is
    /// returned. On cancellation the round is left open for the caller to
    /// settle.
    pub async fn run(
        &self,
        round: &mut Round,
        brief: RoundBrief<'_>,
        progress: &dyn ProgressNotifier,
    ) -> Result<(), RoundError> {
        info!(
            round = round.id,
            participants = round.participants.len(),
            "Starting round"
        );
        progress.on_round_start(round.id, &round.participants);

        for phase in RoundPhase::FAN_OUT {
            self.check_cancelled()?;
            self.phase_fan_out(round, phase, brief, progress).await?;
        }

        self.check_cancelled()?;
        let statements = round.statements.clone();
        let consensus_prompt =
            PromptTemplate::consensus_prompt(brief.topic, brief.org_context, &statements);
        let consensus = self
            .phase_moderator(round, RoundPhase::Consensus, consensus_prompt, progress)
            .await?;
        round.set_consensus(consensus.clone())?;

        self.check_cancelled()?;
        let summary_prompt =
            PromptTemplate::summary_prompt(brief.topic, round.id, &statements, &consensus);
        let summary = self
            .phase_moderator(round, RoundPhase::Summary, summary_prompt, progress)
            .await?;
        round.set_summary(summary)?;

        round.complete()?;
        info!(
            round = round.id,
            statements = round.statements.len(),
            degraded = round.degraded_count(),
            "Round completed"
        );
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), RoundError> {
        if self.invoker.is_cancelled() {
            return Err(RoundError::Cancelled);
        }
        Ok(())
    }

    fn participant_profile(&self, id: &str) -> PersonaProfile {
        self.catalog
            .get(id)
            .cloned()
            .unwrap_or_else(|| PersonaProfile::new(id, id, "Participant"))
    }

    /// Phases 1-3: query every participant in parallel over a fixed snapshot
    async fn phase_fan_out(
        &self,
        round: &mut Round,
        phase: RoundPhase,
        brief: RoundBrief<'_>,
        progress: &dyn ProgressNotifier,
    ) -> Result<(), RoundError> {
        info!(round = round.id, "Phase {}: {}", phase.number(), phase.display_name());
        let personas: Vec<PersonaProfile> = round
            .participants
            .iter()
            .map(|id| self.participant_profile(id))
            .collect();
        progress.on_phase_start(phase, personas.len());

        let history: Vec<Statement> = if phase.sees_history() {
            round.statements.clone()
        } else {
            Vec::new()
        };

        let mut join_set = JoinSet::new();
        for (slot, persona) in personas.iter().enumerate() {
            if self.invoker.is_cancelled() {
                debug!(round = round.id, "Cancellation requested, not spawning further calls");
                break;
            }
            let prompt = if phase.sees_history() {
                PromptTemplate::interactive_prompt(
                    brief.topic,
                    brief.org_context,
                    phase,
                    &history,
                    &persona.id,
                )
            } else {
                PromptTemplate::initial_prompt(brief.topic, brief.org_context, brief.focus_areas)
            };
            let context = PromptContext::new(PromptTemplate::statement_system(persona), prompt);
            let invoker = self.invoker.clone();
            let persona = persona.clone();

            join_set.spawn(async move {
                let timeout = persona.llm.timeout();
                let result = invoker.invoke(&persona, phase, &context, timeout).await;
                (slot, persona.id, result)
            });
        }

        let mut slots: Vec<Option<Statement>> = vec![None; personas.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((slot, id, Ok(statement))) => {
                    debug!(round = round.id, persona = %id, "Statement received");
                    progress.on_task_complete(phase, &id, true);
                    slots[slot] = Some(statement);
                }
                Ok((_, id, Err(ProviderError::Cancelled))) => {
                    progress.on_task_complete(phase, &id, false);
                }
                Ok((slot, id, Err(e))) => {
                    warn!(round = round.id, persona = %id, "Participant degraded: {}", e);
                    progress.on_task_complete(phase, &id, false);
                    slots[slot] = Some(Statement::degraded(&personas[slot], phase, e.to_string()));
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }

        if self.invoker.is_cancelled() {
            return Err(RoundError::Cancelled);
        }

        for (persona, slot) in personas.iter().zip(slots) {
            let statement = slot.unwrap_or_else(|| {
                Statement::degraded(persona, phase, "participant task aborted")
            });
            round.append_statement(statement)?;
        }

        progress.on_phase_complete(phase);
        Ok(())
    }

    /// Phases 4-5: a single moderator call; failure is fatal for the round
    async fn phase_moderator(
        &self,
        round: &mut Round,
        phase: RoundPhase,
        prompt: String,
        progress: &dyn ProgressNotifier,
    ) -> Result<Synthesis, RoundError> {
        info!(round = round.id, "Phase {}: {}", phase.number(), phase.display_name());
        progress.on_phase_start(phase, 1);

        let Some(moderator) = self.catalog.get(&round.moderator).cloned() else {
            let error = RoundError::UnknownModerator(round.moderator.clone());
            round.fail(error.to_string());
            return Err(error);
        };

        let context = PromptContext::new(PromptTemplate::moderator_system(&moderator), prompt);
        let result = self
            .invoker
            .complete(
                &moderator,
                CallPurpose::Statement(phase),
                &context,
                moderator.llm.timeout(),
            )
            .await;

        match result {
            Ok(response) => {
                progress.on_task_complete(phase, &moderator.id, true);
                progress.on_phase_complete(phase);
                Ok(Synthesis::new(&moderator, phase, response.text, response.model))
            }
            Err(ProviderError::Cancelled) => {
                progress.on_task_complete(phase, &moderator.id, false);
                Err(RoundError::Cancelled)
            }
            Err(source) => {
                progress.on_task_complete(phase, &moderator.id, false);
                let error = RoundError::ModeratorFailed {
                    round: round.id,
                    phase,
                    persona: moderator.id.clone(),
                    source,
                };
                warn!("{}", error);
                round.fail(error.to_string());
                Err(error)
            }
        }
    }
}
