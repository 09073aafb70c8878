//! Progress reporting for discussion execution

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use roundtable_application::ports::progress::ProgressNotifier;
use roundtable_domain::{RoundPhase, SessionStatus, SufficiencyJudgment};
use std::sync::Mutex;

/// Reports progress during a discussion with progress bars
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn phase_display_name(phase: RoundPhase) -> String {
        format!("Phase {}: {}", phase.number(), phase.display_name())
    }

    fn print(&self, line: String) {
        // println on MultiProgress keeps the line above the active bars
        let _ = self.multi.println(line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_round_start(&self, round: u32, participants: &[String]) {
        self.print(format!(
            "{} {} ({})",
            "==".cyan(),
            format!("Round {}", round).bold(),
            participants.join(", ")
        ));
    }

    fn on_phase_start(&self, phase: RoundPhase, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::phase_style());
        pb.set_prefix(Self::phase_display_name(phase));
        pb.set_message("Starting...");

        if let Ok(mut slot) = self.phase_bar.lock() {
            *slot = Some(pb);
        }
    }

    fn on_task_complete(&self, _phase: RoundPhase, persona: &str, success: bool) {
        if let Ok(slot) = self.phase_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            let status = if success {
                format!("{} {}", "v".green(), persona)
            } else {
                format!("{} {}", "x".red(), persona)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_phase_complete(&self, phase: RoundPhase) {
        if let Ok(mut slot) = self.phase_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_with_message(format!("{} complete", phase.display_name().green()));
        }
    }

    fn on_judgment(&self, judgment: &SufficiencyJudgment) {
        self.print(format_judgment(judgment));
    }

    fn on_status_change(&self, status: SessionStatus) {
        if status == SessionStatus::Analyzing {
            self.print(format!("{} Extracting issues and solutions...", "->".cyan()));
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_round_start(&self, round: u32, participants: &[String]) {
        println!(
            "{} {} ({})",
            "==".cyan(),
            format!("Round {}", round).bold(),
            participants.join(", ")
        );
    }

    fn on_phase_start(&self, phase: RoundPhase, total_tasks: usize) {
        println!(
            "{} {} ({} tasks)",
            "->".cyan(),
            ProgressReporter::phase_display_name(phase).bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _phase: RoundPhase, persona: &str, success: bool) {
        if success {
            println!("  {} {}", "v".green(), persona);
        } else {
            println!("  {} {} (failed)", "x".red(), persona);
        }
    }

    fn on_phase_complete(&self, _phase: RoundPhase) {
        println!();
    }

    fn on_judgment(&self, judgment: &SufficiencyJudgment) {
        println!("{}", format_judgment(judgment));
    }

    fn on_status_change(&self, status: SessionStatus) {
        println!("{} {}", "status".dimmed(), status);
    }
}

fn format_judgment(judgment: &SufficiencyJudgment) -> String {
    let verdict = if judgment.needs_additional_round {
        "another round".yellow()
    } else if judgment.fail_closed {
        "stop (judge unavailable)".red()
    } else {
        "sufficient".green()
    };
    format!(
        "{} Round {} scored {:.0}/100: {}",
        "**".cyan(),
        judgment.round_id,
        judgment.overall_score,
        verdict
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn judgment(score: f64, needs: bool, fail_closed: bool) -> SufficiencyJudgment {
        SufficiencyJudgment {
            round_id: 2,
            overall_score: score,
            category_coverage: BTreeMap::new(),
            missing_areas: Vec::new(),
            recommended_personas: Vec::new(),
            needs_additional_round: needs,
            reasoning: String::new(),
            fail_closed,
            judged_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_judgment_line() {
        colored::control::set_override(false);

        assert_eq!(
            format_judgment(&judgment(62.4, true, false)),
            "** Round 2 scored 62/100: another round"
        );
        assert_eq!(
            format_judgment(&judgment(0.0, false, true)),
            "** Round 2 scored 0/100: stop (judge unavailable)"
        );
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(
            ProgressReporter::phase_display_name(RoundPhase::InteractiveFirst),
            "Phase 2: Interactive Discussion 1"
        );
    }

    #[test]
    fn test_bar_lifecycle_without_terminal() {
        let reporter = ProgressReporter::new();
        reporter.on_phase_start(RoundPhase::Initial, 2);
        reporter.on_task_complete(RoundPhase::Initial, "tech_lead", true);
        reporter.on_task_complete(RoundPhase::Initial, "scrum_master", false);
        reporter.on_phase_complete(RoundPhase::Initial);

        assert!(reporter.phase_bar.lock().unwrap().is_none());
    }
}
