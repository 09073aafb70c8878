//! Markdown report of a finished (or failed) discussion session

use crate::output::formatter::OutputFormatter;
use roundtable_domain::{
    IdentifiedIssue, PersonaCatalog, Priority, ProposedSolution, Round, RoundPhase, Session,
    Statement, SufficiencyJudgment, Synthesis,
};
use std::fmt::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders a session as a Markdown document.
///
/// Persona names and roles come from the statements themselves; the catalog
/// only supplies the model column of the participants table.
pub struct MarkdownReport<'a> {
    catalog: &'a PersonaCatalog,
}

impl<'a> MarkdownReport<'a> {
    pub fn new(catalog: &'a PersonaCatalog) -> Self {
        Self { catalog }
    }

    pub fn render(&self, session: &Session) -> String {
        let mut out = String::new();
        self.write_header(&mut out, session);
        self.write_executive_summary(&mut out, session);
        self.write_participants(&mut out, session);
        self.write_overview(&mut out, session);
        for round in session.rounds() {
            self.write_round(&mut out, round, session.judgment_for(round.id));
        }
        self.write_issues(&mut out, session.final_issues());
        self.write_solutions(&mut out, session.final_solutions());
        out
    }

    fn write_header(&self, out: &mut String, session: &Session) {
        let _ = writeln!(out, "# Discussion Report: {}\n", session.topic());
        let _ = writeln!(out, "- **Session ID**: `{}`", session.id());
        let _ = writeln!(out, "- **Status**: {}", session.status());
        let _ = writeln!(
            out,
            "- **Started**: {}",
            session.created_at().format(TIME_FORMAT)
        );
        if let Some(completed_at) = session.completed_at() {
            let _ = writeln!(out, "- **Completed**: {}", completed_at.format(TIME_FORMAT));
        }
        if let Some(reason) = session.failure_reason() {
            let _ = writeln!(out, "- **Failure reason**: {}", reason);
        }
        if !session.org_context().is_empty() {
            let _ = writeln!(out, "\n**Organization context**\n");
            let _ = writeln!(out, "{}", session.org_context().format_for_prompt());
        }
        out.push('\n');
    }

    fn write_executive_summary(&self, out: &mut String, session: &Session) {
        let _ = writeln!(out, "## Executive Summary\n");
        let summary = session
            .rounds()
            .iter()
            .rev()
            .find_map(|r| r.summary.as_ref());
        match summary {
            Some(summary) => {
                let _ = writeln!(out, "{}\n", summary.content.trim());
            }
            None => {
                let _ = writeln!(out, "_No summary available._\n");
            }
        }
    }

    fn write_participants(&self, out: &mut String, session: &Session) {
        let _ = writeln!(out, "## Participants\n");
        let _ = writeln!(out, "| ID | Name | Role | Model |");
        let _ = writeln!(out, "|---|---|---|---|");

        let mut ids = session.all_participants();
        for round in session.rounds() {
            if !ids.contains(&round.moderator) {
                ids.push(round.moderator.clone());
            }
        }
        for id in ids {
            match self.catalog.get(&id) {
                Some(persona) => {
                    let _ = writeln!(
                        out,
                        "| {} | {} | {} | {} |",
                        persona.id, persona.name, persona.role, persona.llm.model
                    );
                }
                None => {
                    let _ = writeln!(out, "| {} | - | - | - |", id);
                }
            }
        }
        out.push('\n');
    }

    fn write_overview(&self, out: &mut String, session: &Session) {
        let statements: Vec<&Statement> = session.all_statements().collect();
        let degraded = statements.iter().filter(|s| s.failed).count();
        let raw_issues: usize = statements.iter().map(|s| s.raw_issues.len()).sum();
        let raw_solutions: usize = statements.iter().map(|s| s.raw_solutions.len()).sum();

        let _ = writeln!(out, "## Overview\n");
        let _ = writeln!(out, "| Metric | Value |");
        let _ = writeln!(out, "|---|---|");
        let rows = [
            ("Rounds", session.round_count() as usize),
            ("Statements", statements.len()),
            ("Degraded statements", degraded),
            ("Raw issue fragments", raw_issues),
            ("Raw solution fragments", raw_solutions),
            ("Identified issues", session.final_issues().len()),
            ("Proposed solutions", session.final_solutions().len()),
        ];
        for (label, value) in rows {
            let _ = writeln!(out, "| {} | {} |", label, value);
        }
        out.push('\n');
    }

    fn write_round(&self, out: &mut String, round: &Round, judgment: Option<&SufficiencyJudgment>) {
        let _ = writeln!(out, "## Round {}\n", round.id);
        let _ = writeln!(out, "**Participants**: {}\n", round.participants.join(", "));
        if let Some(reason) = &round.failure {
            let _ = writeln!(out, "> Round failed: {}\n", reason);
        }

        for phase in RoundPhase::FAN_OUT {
            let statements: Vec<&Statement> = round.statements_in(phase).collect();
            if statements.is_empty() {
                continue;
            }
            let _ = writeln!(out, "### Phase {}: {}\n", phase.number(), phase.display_name());
            for statement in statements {
                let _ = writeln!(out, "#### {} ({})\n", statement.persona_name, statement.role);
                if statement.failed {
                    let _ = writeln!(
                        out,
                        "_Unavailable: {}_\n",
                        statement.error.as_deref().unwrap_or("unknown error")
                    );
                } else {
                    let _ = writeln!(out, "{}\n", statement.content.trim());
                }
            }
        }

        for synthesis in [&round.consensus, &round.summary].into_iter().flatten() {
            write_synthesis(out, synthesis);
        }

        if let Some(judgment) = judgment {
            write_judgment(out, judgment);
        }
    }

    fn write_issues(&self, out: &mut String, issues: &[IdentifiedIssue]) {
        let _ = writeln!(out, "## Identified Issues\n");
        if issues.is_empty() {
            let _ = writeln!(out, "_No issues were extracted._\n");
            return;
        }

        for priority in Priority::ALL {
            let group: Vec<&IdentifiedIssue> =
                issues.iter().filter(|i| i.priority == priority).collect();
            if group.is_empty() {
                continue;
            }
            let _ = writeln!(out, "### Priority: {}\n", priority);
            for issue in group {
                let _ = writeln!(out, "#### {}: {}\n", issue.id, issue.title);
                let _ = writeln!(out, "- **Category**: {}", issue.category);
                if !issue.mentioned_by.is_empty() {
                    let names: Vec<&str> = issue.mentioned_by.iter().map(String::as_str).collect();
                    let _ = writeln!(out, "- **Raised by**: {}", names.join(", "));
                }
                write_list(out, "Root causes", &issue.root_causes);
                write_list(out, "Affected areas", &issue.affected_areas);
                if !issue.description.is_empty() {
                    let _ = writeln!(out, "\n{}", issue.description);
                }
                out.push('\n');
            }
        }
    }

    fn write_solutions(&self, out: &mut String, solutions: &[ProposedSolution]) {
        let _ = writeln!(out, "## Proposed Solutions\n");
        if solutions.is_empty() {
            let _ = writeln!(out, "_No solutions were extracted._\n");
            return;
        }

        for solution in solutions {
            let _ = writeln!(
                out,
                "### {}: {} (addresses {})\n",
                solution.id, solution.title, solution.issue_id
            );
            if !solution.description.is_empty() {
                let _ = writeln!(out, "{}\n", solution.description);
            }
            if !solution.implementation_steps.is_empty() {
                let _ = writeln!(out, "**Implementation steps**\n");
                for (i, step) in solution.implementation_steps.iter().enumerate() {
                    let _ = writeln!(out, "{}. {}", i + 1, step);
                }
                out.push('\n');
            }
            if !solution.timeline.is_empty() {
                let _ = writeln!(out, "- **Timeline**: {}", solution.timeline);
            }
            write_list(out, "Required resources", &solution.required_resources);
            write_list(out, "Risks", &solution.risks);
            write_list(out, "Expected outcomes", &solution.expected_outcomes);
            out.push('\n');
        }
    }
}

impl OutputFormatter for MarkdownReport<'_> {
    fn format(&self, session: &Session) -> String {
        self.render(session)
    }
}

fn write_synthesis(out: &mut String, synthesis: &Synthesis) {
    let _ = writeln!(
        out,
        "### Phase {}: {} ({})\n",
        synthesis.phase.number(),
        synthesis.phase.display_name(),
        synthesis.persona_name
    );
    let _ = writeln!(out, "{}\n", synthesis.content.trim());
}

fn write_judgment(out: &mut String, judgment: &SufficiencyJudgment) {
    let _ = writeln!(out, "### Sufficiency Judgment\n");
    let _ = writeln!(out, "- **Score**: {:.0}/100", judgment.overall_score);
    let _ = writeln!(
        out,
        "- **Another round**: {}",
        if judgment.needs_additional_round { "yes" } else { "no" }
    );
    if judgment.fail_closed {
        let _ = writeln!(out, "- **Note**: the judge could not be consulted");
    }
    let coverage: Vec<String> = judgment
        .category_coverage
        .iter()
        .map(|(category, score)| format!("{} {:.0}", category, score))
        .collect();
    if !coverage.is_empty() {
        let _ = writeln!(out, "- **Coverage**: {}", coverage.join(", "));
    }
    write_list(out, "Missing areas", &judgment.missing_areas);
    write_list(out, "Recommended personas", &judgment.recommended_personas);
    if !judgment.reasoning.is_empty() {
        let _ = writeln!(out, "\n{}", judgment.reasoning.trim());
    }
    out.push('\n');
}

fn write_list(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = writeln!(out, "- **{}**: {}", label, items.join("; "));
    }
}
