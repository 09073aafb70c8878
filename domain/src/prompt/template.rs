//! Prompt templates for the round protocol

use crate::core::string::truncate;
use crate::discussion::org_context::OrgContext;
use crate::discussion::phase::RoundPhase;
use crate::discussion::round::Round;
use crate::discussion::statement::{Statement, Synthesis};
use crate::findings::category::IssueCategory;
use crate::persona::profile::PersonaProfile;

/// Longest excerpt of one earlier statement quoted back into a prompt
const HISTORY_EXCERPT_BYTES: usize = 1500;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    fn header(topic: &str, org: &OrgContext) -> String {
        format!(
            "Discussion topic: {}\n\nOrganization context:\n{}\n",
            topic,
            org.format_for_prompt()
        )
    }

    fn fragment_instructions() -> &'static str {
        r#"End your answer with two sections, each a numbered list of short one-line items:

ISSUES:
1. <an organizational issue you see>

SOLUTIONS:
1. <a concrete remedy you propose>"#
    }

    fn render_statements<'a>(statements: impl Iterator<Item = &'a Statement>) -> String {
        let mut out = String::new();
        for stmt in statements.filter(|s| s.is_success()) {
            out.push_str(&format!(
                "\n--- {} ({}) [{}] ---\n{}\n",
                stmt.persona_name,
                stmt.role,
                stmt.phase.as_str(),
                truncate(&stmt.content, HISTORY_EXCERPT_BYTES)
            ));
        }
        if out.is_empty() {
            out.push_str("\n(no statements recorded)\n");
        }
        out
    }

    /// System prompt for a persona statement: character brief plus output format
    pub fn statement_system(persona: &PersonaProfile) -> String {
        let brief = if persona.system_prompt.is_empty() {
            format!("You are {}.", persona.label())
        } else {
            persona.system_prompt.clone()
        };
        format!("{}\n\n{}", brief, Self::fragment_instructions())
    }

    /// Phase 1: independent opening statement
    pub fn initial_prompt(topic: &str, org: &OrgContext, focus_areas: &[String]) -> String {
        let mut prompt = Self::header(topic, org);
        if !focus_areas.is_empty() {
            prompt.push_str("\nThe previous round left these areas under-explored. Give them particular attention:\n");
            for area in focus_areas {
                prompt.push_str(&format!("- {}\n", area));
            }
        }
        prompt.push_str(
            r#"
Share your initial view of the topic from your own role and experience:
1. The most important issues you see
2. Their likely root causes
3. What you would do about them, with concrete examples"#,
        );
        prompt
    }

    /// Phases 2-3: respond to the statements gathered so far in the round
    pub fn interactive_prompt(
        topic: &str,
        org: &OrgContext,
        phase: RoundPhase,
        history: &[Statement],
        persona_id: &str,
    ) -> String {
        let mut prompt = Self::header(topic, org);
        prompt.push_str("\nStatements so far in this round:\n");
        prompt.push_str(&Self::render_statements(history.iter()));

        let own = history
            .iter()
            .filter(|s| s.persona_id == persona_id && s.is_success())
            .count();
        let ask = match phase {
            RoundPhase::InteractiveSecond => {
                "This is the second exchange. Narrow the discussion: say where you now agree, what remains contested, and which remedies you would prioritize first."
            }
            _ => {
                "React to the other participants. Point out where you agree or disagree and why, add anything they missed, and refine your proposals."
            }
        };
        prompt.push_str(&format!(
            "\n{}\n(You have made {} earlier statement(s) in this round.)",
            ask, own
        ));
        prompt
    }

    /// System prompt for the moderator's consensus and summary phases
    pub fn moderator_system(moderator: &PersonaProfile) -> String {
        format!(
            r#"{}

You are moderating this round. Be balanced and objective. Give weight to well-reasoned arguments regardless of who made them."#,
            if moderator.system_prompt.is_empty() {
                format!("You are {}.", moderator.label())
            } else {
                moderator.system_prompt.clone()
            }
        )
    }

    /// Phase 4: synthesize points of agreement and disagreement
    pub fn consensus_prompt(topic: &str, org: &OrgContext, statements: &[Statement]) -> String {
        let mut prompt = Self::header(topic, org);
        prompt.push_str("\nAll statements of this round:\n");
        prompt.push_str(&Self::render_statements(statements.iter()));
        prompt.push_str(
            r#"
Build the consensus of this round:

1. **Agreed issues**: issues most participants recognize (bullet list)
2. **Agreed remedies**: remedies with broad support (bullet list)
3. **Open disagreements**: where views still differ, and which position is better supported
4. **Gaps**: important aspects nobody addressed"#,
        );
        prompt
    }

    /// Phase 5: executive summary of the round
    pub fn summary_prompt(
        topic: &str,
        round_id: u32,
        statements: &[Statement],
        consensus: &Synthesis,
    ) -> String {
        let participants: Vec<&str> = {
            let mut names: Vec<&str> = statements.iter().map(|s| s.persona_name.as_str()).collect();
            names.dedup();
            names
        };
        format!(
            r#"Discussion topic: {}

Round {} participants: {}

Consensus reached in this round:
{}

Write an executive summary of round {} for a leadership audience: at most five short paragraphs covering the key findings, the recommended next steps and the main risks."#,
            topic,
            round_id,
            participants.join(", "),
            consensus.content,
            round_id
        )
    }

    /// System prompt for the sufficiency judge
    pub fn judge_system() -> &'static str {
        r#"You evaluate whether a panel discussion has covered its problem space well enough to stop.
Be strict and calibrated. Reply with a single JSON object and nothing else."#
    }

    /// Judge prompt over every round gathered so far
    pub fn judge_prompt(
        topic: &str,
        org: &OrgContext,
        rounds: &[Round],
        available_personas: &[&PersonaProfile],
    ) -> String {
        let mut prompt = Self::header(topic, org);
        for round in rounds {
            prompt.push_str(&format!("\n=== Round {} ===\n", round.id));
            if let Some(summary) = &round.summary {
                prompt.push_str(&format!("Summary:\n{}\n", summary.content));
            }
            if let Some(consensus) = &round.consensus {
                prompt.push_str(&format!("Consensus:\n{}\n", consensus.content));
            }
            let fragments: Vec<&String> = round
                .successful_statements()
                .flat_map(|s| s.raw_issues.iter())
                .collect();
            if !fragments.is_empty() {
                prompt.push_str("Issues raised:\n");
                for fragment in fragments {
                    prompt.push_str(&format!("- {}\n", fragment));
                }
            }
        }

        prompt.push_str("\nCategories to score (0-100 coverage each):\n");
        for category in IssueCategory::ALL {
            prompt.push_str(&format!("- {}: {}\n", category.as_str(), category.display_name()));
        }
        prompt.push_str("\nPersonas that could be invited to the next round:\n");
        for persona in available_personas {
            prompt.push_str(&format!("- {}: {}\n", persona.id, persona.label()));
        }

        prompt.push_str(
            r#"
Respond with JSON in exactly this shape:
{
  "overall_score": <0-100>,
  "category_coverage": {"<category id>": <0-100>, ...},
  "missing_areas": ["<under-explored area>", ...],
  "recommended_personas": ["<persona id from the list above>", ...],
  "reasoning": "<two or three sentences>"
}"#,
        );
        prompt
    }

    /// System prompt for structured extraction
    pub fn extraction_system() -> &'static str {
        r#"You turn discussion transcripts into structured data. Only report issues and solutions the participants actually raised.
Reply with a single JSON object and nothing else."#
    }

    /// Extraction prompt for one completed round
    pub fn extraction_prompt(topic: &str, round: &Round) -> String {
        let mut prompt = format!("Discussion topic: {}\n\nRound {} statements:\n", topic, round.id);
        for stmt in round.successful_statements() {
            prompt.push_str(&format!(
                "\n--- {} [persona id: {}] ---\n{}\n",
                stmt.persona_name,
                stmt.persona_id,
                truncate(&stmt.content, HISTORY_EXCERPT_BYTES * 2)
            ));
        }
        if let Some(consensus) = &round.consensus {
            prompt.push_str(&format!("\n--- Consensus ---\n{}\n", consensus.content));
        }

        let categories: Vec<&str> = IssueCategory::ALL.iter().map(|c| c.as_str()).collect();
        prompt.push_str(&format!(
            r#"
Extract the issues and solutions as JSON:
{{
  "issues": [{{
    "id": "<local id, e.g. I1>",
    "title": "<short title>",
    "description": "<one paragraph>",
    "category": "<one of: {}>",
    "priority": "<critical|high|medium|low>",
    "root_causes": ["..."],
    "affected_areas": ["..."],
    "mentioned_by": ["<persona id>", ...]
  }}],
  "solutions": [{{
    "issue_id": "<local id of the issue it addresses>",
    "title": "<short title>",
    "description": "<one paragraph>",
    "implementation_steps": ["..."],
    "required_resources": ["..."],
    "timeline": "<e.g. 3 months>",
    "risks": ["..."],
    "expected_outcomes": ["..."]
  }}]
}}"#,
            categories.join(", ")
        ));
        prompt
    }
}
