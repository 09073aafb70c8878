//! Statements and syntheses produced during a round

use super::phase::RoundPhase;
use crate::parsing::parse_fragments;
use crate::persona::profile::PersonaProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persona's contribution to a fan-out phase (Value Object)
///
/// Immutable once created. `raw_issues` and `raw_solutions` hold the
/// unstructured fragments the persona listed; they are only given structure
/// during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub persona_id: String,
    pub persona_name: String,
    pub role: String,
    pub phase: RoundPhase,
    pub content: String,
    #[serde(default)]
    pub raw_issues: Vec<String>,
    #[serde(default)]
    pub raw_solutions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    #[serde(default)]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Statement {
    /// Build a statement from a provider reply, parsing its fragment sections
    pub fn from_response(
        persona: &PersonaProfile,
        phase: RoundPhase,
        text: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let content = text.into();
        let fragments = parse_fragments(&content);
        Self {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            role: persona.role.clone(),
            phase,
            content,
            raw_issues: fragments.issues,
            raw_solutions: fragments.solutions,
            timestamp: Utc::now(),
            model: model.into(),
            failed: false,
            error: None,
        }
    }

    /// Placeholder recorded when a persona could not be reached
    pub fn degraded(persona: &PersonaProfile, phase: RoundPhase, error: impl Into<String>) -> Self {
        Self {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            role: persona.role.clone(),
            phase,
            content: String::new(),
            raw_issues: Vec::new(),
            raw_solutions: Vec::new(),
            timestamp: Utc::now(),
            model: persona.llm.model.clone(),
            failed: true,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.failed
    }
}

/// Moderator output for the consensus or summary phase (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub persona_id: String,
    pub persona_name: String,
    pub phase: RoundPhase,
    pub content: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

impl Synthesis {
    pub fn new(
        persona: &PersonaProfile,
        phase: RoundPhase,
        content: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            phase,
            content: content.into(),
            model: model.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::profile::LlmSettings;

    fn persona() -> PersonaProfile {
        PersonaProfile::new("tech_lead", "Kenta Yamada", "Tech Lead")
            .with_llm(LlmSettings::default().with_model("gpt-4o-mini"))
    }

    #[test]
    fn test_from_response_parses_fragments() {
        let text = "We ship slowly.\n\nISSUES:\n1. Reviews queue for days\n\nSOLUTIONS:\n1. Rotate a review buddy";
        let stmt = Statement::from_response(&persona(), RoundPhase::Initial, text, "gpt-4o");
        assert!(stmt.is_success());
        assert_eq!(stmt.raw_issues, vec!["Reviews queue for days"]);
        assert_eq!(stmt.raw_solutions, vec!["Rotate a review buddy"]);
        assert_eq!(stmt.model, "gpt-4o");
    }

    #[test]
    fn test_degraded_statement_carries_error() {
        let stmt = Statement::degraded(&persona(), RoundPhase::InteractiveFirst, "timeout");
        assert!(stmt.failed);
        assert_eq!(stmt.error.as_deref(), Some("timeout"));
        assert!(stmt.content.is_empty());
        assert_eq!(stmt.model, "gpt-4o-mini");
    }
}
