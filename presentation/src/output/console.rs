//! Console output formatter for sessions and the persona catalog

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use roundtable_domain::core::string::truncate_chars;
use roundtable_domain::{PersonaCatalog, Session, SessionStatus};

/// Formats sessions for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Status overview of one session
    pub fn format(session: &Session) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Discussion Session"));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "ID:".cyan().bold(), session.id()));
        output.push_str(&format!("{} {}\n", "Topic:".cyan().bold(), session.topic()));
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            Self::status_label(session.status())
        ));
        if let Some(reason) = session.failure_reason() {
            output.push_str(&format!("{} {}\n", "Failure:".red().bold(), reason));
        }
        output.push_str(&format!(
            "{} {}\n",
            "Created:".cyan().bold(),
            session.created_at().format("%Y-%m-%d %H:%M:%S UTC")
        ));

        output.push_str(&Self::section_header("Rounds"));
        if session.rounds().is_empty() {
            output.push_str("  (none)\n");
        }
        for round in session.rounds() {
            let state = if round.is_failed() {
                "failed".red()
            } else if round.is_completed() {
                "completed".green()
            } else {
                "open".yellow()
            };
            output.push_str(&format!(
                "  Round {} [{}] {} participants, {} statements ({} degraded)\n",
                round.id,
                state,
                round.participants.len(),
                round.statements.len(),
                round.degraded_count()
            ));
            if let Some(judgment) = session.judgment_for(round.id) {
                output.push_str(&format!(
                    "    judged {:.0}/100, {}\n",
                    judgment.overall_score,
                    if judgment.needs_additional_round {
                        "continue"
                    } else {
                        "stop"
                    }
                ));
            }
        }

        if session.status() == SessionStatus::Completed {
            output.push_str(&Self::section_header("Findings"));
            output.push_str(&format!(
                "  {} issues, {} solutions\n",
                session.final_issues().len(),
                session.final_solutions().len()
            ));
            for issue in session.final_issues() {
                output.push_str(&format!(
                    "  {} [{}] {}\n",
                    issue.id.yellow(),
                    issue.priority,
                    issue.title
                ));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// One line per session
    pub fn format_list(sessions: &[Session]) -> String {
        if sessions.is_empty() {
            return "No sessions stored.\n".to_string();
        }

        let mut output = String::new();
        for session in sessions {
            output.push_str(&format!(
                "{}  {:<22} {:>2} rounds  {}\n",
                session.id().to_string().dimmed(),
                Self::status_label(session.status()),
                session.round_count(),
                truncate_chars(session.topic(), 60)
            ));
        }
        output
    }

    pub fn format_personas(catalog: &PersonaCatalog) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Persona Catalog"));
        output.push('\n');
        for persona in catalog.iter() {
            output.push_str(&format!(
                "{:<20} {:<14} {} ({}/{})\n",
                persona.id.yellow().bold(),
                persona.kind.as_str(),
                persona.label(),
                persona.llm.provider,
                persona.llm.model
            ));
            if !persona.perspective.is_empty() {
                output.push_str(&format!("{:<35} {}\n", "", persona.perspective.dimmed()));
            }
        }
        output
    }

    fn status_label(status: SessionStatus) -> String {
        let label = status.to_string();
        match status {
            SessionStatus::Completed => label.green().to_string(),
            SessionStatus::Failed => label.red().to_string(),
            _ => label.yellow().to_string(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, session: &Session) -> String {
        Self::format(session)
    }
}
