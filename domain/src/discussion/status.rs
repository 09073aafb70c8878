//! Session lifecycle state machine.
//!
//! ```text
//! Initialized ─► RoundInProgress(1) ─► Judging(1) ─┬─► RoundInProgress(2) ─► ...
//!                                                  └─► Analyzing ─► Completed
//!
//! any non-terminal status ─► Failed
//! ```
//!
//! Statuses form a partial order. Every legal transition moves strictly up
//! that order; `Completed` and `Failed` are both maximal and incomparable.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a discussion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, no round started yet
    Initialized,
    /// Round `n` is running its phase protocol
    RoundInProgress(u32),
    /// Round `n` finished; waiting for (or holding) its sufficiency judgment
    Judging(u32),
    /// Round loop is over; structured findings are being extracted
    Analyzing,
    /// Extraction finished
    Completed,
    /// Terminated by a fatal failure or cancellation
    Failed,
}

/// Rejected state machine edge.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid status transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

impl SessionStatus {
    /// Terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Round number carried by the status, if any
    pub fn round(&self) -> Option<u32> {
        match self {
            SessionStatus::RoundInProgress(n) | SessionStatus::Judging(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initialized => "initialized",
            SessionStatus::RoundInProgress(_) => "round_in_progress",
            SessionStatus::Judging(_) => "judging",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    /// Position in the lifecycle, used for ordering non-terminal statuses.
    ///
    /// Rounds are interleaved as `RoundInProgress(n) < Judging(n) < RoundInProgress(n + 1)`.
    fn rank(&self) -> (u8, u32, u8) {
        match self {
            SessionStatus::Initialized => (0, 0, 0),
            SessionStatus::RoundInProgress(n) => (1, *n, 0),
            SessionStatus::Judging(n) => (1, *n, 1),
            SessionStatus::Analyzing => (2, 0, 0),
            SessionStatus::Completed | SessionStatus::Failed => (3, 0, 0),
        }
    }

    /// Whether `next` is a direct edge of the state machine.
    ///
    /// The `max_rounds` bound on `Judging(n) -> RoundInProgress(n + 1)` is a
    /// policy decision checked by the caller, not a structural one.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (*self, next) {
            (from, Failed) => !from.is_terminal(),
            (Initialized, RoundInProgress(1)) => true,
            (RoundInProgress(n), Judging(m)) => n == m,
            (Judging(n), RoundInProgress(m)) => m == n + 1,
            (Judging(_), Analyzing) => true,
            (Analyzing, Completed) => true,
            _ => false,
        }
    }

    /// Validate a transition.
    ///
    /// Returns `Ok(false)` when `next` equals the current status, so that a
    /// repeated driving signal is absorbed as a no-op.
    pub fn check_transition(&self, next: SessionStatus) -> Result<bool, TransitionError> {
        if *self == next {
            return Ok(false);
        }
        if self.can_transition_to(next) {
            Ok(true)
        } else {
            Err(TransitionError {
                from: *self,
                to: next,
            })
        }
    }
}

impl PartialOrd for SessionStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        if self.is_terminal() && other.is_terminal() {
            return None;
        }
        Some(self.rank().cmp(&other.rank()))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::RoundInProgress(n) => write!(f, "ROUND_IN_PROGRESS({})", n),
            SessionStatus::Judging(n) => write!(f, "JUDGING({})", n),
            other => f.write_str(&other.as_str().to_uppercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    #[test]
    fn test_happy_path_edges() {
        assert!(Initialized.can_transition_to(RoundInProgress(1)));
        assert!(RoundInProgress(1).can_transition_to(Judging(1)));
        assert!(Judging(1).can_transition_to(RoundInProgress(2)));
        assert!(Judging(2).can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Completed));
    }

    #[test]
    fn test_rejected_edges() {
        assert!(!Initialized.can_transition_to(RoundInProgress(2)));
        assert!(!RoundInProgress(1).can_transition_to(Judging(2)));
        assert!(!Judging(1).can_transition_to(RoundInProgress(3)));
        assert!(!Judging(2).can_transition_to(RoundInProgress(1)));
        assert!(!Analyzing.can_transition_to(RoundInProgress(1)));
        assert!(!Initialized.can_transition_to(Analyzing));
    }

    #[test]
    fn test_failed_reachable_from_every_non_terminal() {
        for status in [
            Initialized,
            RoundInProgress(1),
            Judging(3),
            Analyzing,
        ] {
            assert!(status.can_transition_to(Failed), "{status}");
        }
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn test_check_transition_is_idempotent() {
        assert_eq!(Judging(2).check_transition(Judging(2)), Ok(false));
        assert_eq!(Completed.check_transition(Completed), Ok(false));
        assert_eq!(Judging(2).check_transition(Analyzing), Ok(true));

        let err = Completed.check_transition(Analyzing).unwrap_err();
        assert_eq!(err.from, Completed);
        assert_eq!(err.to, Analyzing);
    }

    #[test]
    fn test_every_edge_moves_up_the_order() {
        let all = [
            Initialized,
            RoundInProgress(1),
            Judging(1),
            RoundInProgress(2),
            Judging(2),
            Analyzing,
            Completed,
            Failed,
        ];
        for from in all {
            for to in all {
                if from.can_transition_to(to) {
                    assert_eq!(from.partial_cmp(&to), Some(Ordering::Less), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_terminal_statuses_are_incomparable() {
        assert_eq!(Completed.partial_cmp(&Failed), None);
        assert!(Analyzing < Completed);
        assert!(Judging(5) < Failed);
        assert!(RoundInProgress(2) > Judging(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(RoundInProgress(2).to_string(), "ROUND_IN_PROGRESS(2)");
        assert_eq!(Judging(1).to_string(), "JUDGING(1)");
        assert_eq!(Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Judging(2)).unwrap();
        assert_eq!(json, r#"{"state":"judging","round":2}"#);
        let json = serde_json::to_string(&Analyzing).unwrap();
        assert_eq!(json, r#"{"state":"analyzing"}"#);
        let back: SessionStatus = serde_json::from_str(r#"{"state":"round_in_progress","round":3}"#).unwrap();
        assert_eq!(back, RoundInProgress(3));
    }
}
