//! Progress notification port
//!
//! Defines the interface for reporting progress while a discussion runs.

use roundtable_domain::{RoundPhase, SessionStatus, SufficiencyJudgment};

/// Callback for progress updates during a discussion
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (progress bars, plain text, ...).
pub trait ProgressNotifier: Send + Sync {
    /// Called when a round starts
    fn on_round_start(&self, _round: u32, _participants: &[String]) {}

    /// Called when a phase starts
    fn on_phase_start(&self, phase: RoundPhase, total_tasks: usize);

    /// Called when one persona call within a phase resolves
    fn on_task_complete(&self, phase: RoundPhase, persona: &str, success: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: RoundPhase);

    /// Called after a sufficiency judgment is recorded
    fn on_judgment(&self, _judgment: &SufficiencyJudgment) {}

    /// Called whenever the session status changes
    fn on_status_change(&self, _status: SessionStatus) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: RoundPhase, _total_tasks: usize) {}
    fn on_task_complete(&self, _phase: RoundPhase, _persona: &str, _success: bool) {}
    fn on_phase_complete(&self, _phase: RoundPhase) {}
}
