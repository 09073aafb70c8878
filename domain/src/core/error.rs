//! Domain error types

use crate::discussion::status::TransitionError;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No participants selected for round {0}")]
    NoParticipants(u32),

    #[error("Persona '{persona}' is not a participant of round {round}")]
    NotAParticipant { persona: String, round: u32 },

    #[error("Round {0} is already closed")]
    RoundClosed(u32),

    #[error("Round {0} cannot complete without consensus and summary")]
    RoundIncomplete(u32),

    #[error("Round {0} does not exist")]
    UnknownRound(u32),

    #[error("A judgment for round {0} has already been recorded")]
    DuplicateJudgment(u32),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),
}

impl DomainError {
    /// Check if this error represents a state machine conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Transition(_))
    }
}
