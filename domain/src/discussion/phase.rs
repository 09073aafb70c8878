//! The fixed five-phase protocol every round follows

use serde::{Deserialize, Serialize};

/// Phase of a discussion round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Every participant answers the topic independently
    Initial,
    /// First interactive pass over the statements gathered so far
    InteractiveFirst,
    /// Second interactive pass, seeing the first pass too
    InteractiveSecond,
    /// Moderator synthesizes points of agreement
    Consensus,
    /// Moderator writes the executive summary of the round
    Summary,
}

impl RoundPhase {
    /// All phases in execution order
    pub const ALL: [RoundPhase; 5] = [
        RoundPhase::Initial,
        RoundPhase::InteractiveFirst,
        RoundPhase::InteractiveSecond,
        RoundPhase::Consensus,
        RoundPhase::Summary,
    ];

    /// Phases in which every participant is invoked concurrently
    pub const FAN_OUT: [RoundPhase; 3] = [
        RoundPhase::Initial,
        RoundPhase::InteractiveFirst,
        RoundPhase::InteractiveSecond,
    ];

    /// 1-based position in the protocol
    pub fn number(&self) -> u8 {
        match self {
            RoundPhase::Initial => 1,
            RoundPhase::InteractiveFirst => 2,
            RoundPhase::InteractiveSecond => 3,
            RoundPhase::Consensus => 4,
            RoundPhase::Summary => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Initial => "initial",
            RoundPhase::InteractiveFirst => "interactive_1",
            RoundPhase::InteractiveSecond => "interactive_2",
            RoundPhase::Consensus => "consensus",
            RoundPhase::Summary => "summary",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoundPhase::Initial => "Initial Statements",
            RoundPhase::InteractiveFirst => "Interactive Discussion 1",
            RoundPhase::InteractiveSecond => "Interactive Discussion 2",
            RoundPhase::Consensus => "Consensus",
            RoundPhase::Summary => "Summary",
        }
    }

    /// Fan-out phases tolerate individual persona failures
    pub fn is_fan_out(&self) -> bool {
        matches!(
            self,
            RoundPhase::Initial | RoundPhase::InteractiveFirst | RoundPhase::InteractiveSecond
        )
    }

    /// Interactive phases receive the statement history of the round
    pub fn sees_history(&self) -> bool {
        !matches!(self, RoundPhase::Initial)
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
