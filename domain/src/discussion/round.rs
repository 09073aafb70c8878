//! Round entity

use super::phase::RoundPhase;
use super::statement::{Statement, Synthesis};
use crate::core::error::DomainError;
use crate::core::string::normalize_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One full run of the five-phase protocol among a fixed participant set (Entity)
///
/// Immutable once completed or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: u32,
    pub participants: Vec<String>,
    pub moderator: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
    /// Normalized raw issue fragment -> personas that raised it.
    /// Derived from the statements when the round completes.
    #[serde(default)]
    pub issue_mentions: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub consensus: Option<Synthesis>,
    #[serde(default)]
    pub summary: Option<Synthesis>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure: Option<String>,
}

impl Round {
    /// Create a round; duplicate participant ids are collapsed, order kept.
    pub fn new(
        id: u32,
        participants: impl IntoIterator<Item = String>,
        moderator: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let mut seen = BTreeSet::new();
        let participants: Vec<String> = participants
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        if participants.is_empty() {
            return Err(DomainError::NoParticipants(id));
        }
        Ok(Self {
            id,
            participants,
            moderator: moderator.into(),
            statements: Vec::new(),
            issue_mentions: BTreeMap::new(),
            consensus: None,
            summary: None,
            started_at: Utc::now(),
            completed_at: None,
            failure: None,
        })
    }

    pub fn is_participant(&self, persona_id: &str) -> bool {
        self.participants.iter().any(|p| p == persona_id)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Completed and failed rounds reject further mutation
    pub fn is_closed(&self) -> bool {
        self.is_completed() || self.is_failed()
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::RoundClosed(self.id));
        }
        Ok(())
    }

    /// Append a statement; the author must be a participant.
    pub fn append_statement(&mut self, statement: Statement) -> Result<(), DomainError> {
        self.ensure_open()?;
        if !self.is_participant(&statement.persona_id) {
            return Err(DomainError::NotAParticipant {
                persona: statement.persona_id,
                round: self.id,
            });
        }
        self.statements.push(statement);
        Ok(())
    }

    pub fn set_consensus(&mut self, synthesis: Synthesis) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.consensus = Some(synthesis);
        Ok(())
    }

    pub fn set_summary(&mut self, synthesis: Synthesis) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.summary = Some(synthesis);
        Ok(())
    }

    /// Close the round, deriving its issue mentions.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.consensus.is_none() || self.summary.is_none() {
            return Err(DomainError::RoundIncomplete(self.id));
        }
        self.issue_mentions = self.collect_issue_mentions();
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the round failed. Statements gathered so far are kept for audit.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.is_closed() {
            return;
        }
        self.failure = Some(reason.into());
    }

    /// Drop partial output so an interrupted round can run again from phase 1
    pub fn reset(&mut self) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.statements.clear();
        self.consensus = None;
        self.summary = None;
        self.started_at = Utc::now();
        Ok(())
    }

    pub fn statements_in(&self, phase: RoundPhase) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(move |s| s.phase == phase)
    }

    pub fn successful_statements(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| s.is_success())
    }

    pub fn degraded_count(&self) -> usize {
        self.statements.iter().filter(|s| s.failed).count()
    }

    fn collect_issue_mentions(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut mentions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for statement in self.successful_statements() {
            for fragment in &statement.raw_issues {
                let key = normalize_key(fragment);
                if key.is_empty() {
                    continue;
                }
                mentions
                    .entry(key)
                    .or_default()
                    .insert(statement.persona_id.clone());
            }
        }
        mentions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::profile::PersonaProfile;

    fn persona(id: &str) -> PersonaProfile {
        PersonaProfile::new(id, id, "role")
    }

    fn round() -> Round {
        Round::new(1, vec!["a".to_string(), "b".to_string(), "a".to_string()], "mod").unwrap()
    }

    #[test]
    fn test_new_dedups_participants() {
        assert_eq!(round().participants, vec!["a", "b"]);
        assert_eq!(
            Round::new(4, Vec::<String>::new(), "mod").unwrap_err(),
            DomainError::NoParticipants(4)
        );
    }

    #[test]
    fn test_append_rejects_non_participant() {
        let mut round = round();
        let stmt = Statement::from_response(&persona("c"), RoundPhase::Initial, "hi", "m");
        assert_eq!(
            round.append_statement(stmt).unwrap_err(),
            DomainError::NotAParticipant {
                persona: "c".to_string(),
                round: 1
            }
        );
        assert!(round.statements.is_empty());
    }

    #[test]
    fn test_complete_requires_syntheses() {
        let mut round = round();
        assert_eq!(round.complete().unwrap_err(), DomainError::RoundIncomplete(1));

        let moderator = persona("mod");
        round
            .set_consensus(Synthesis::new(&moderator, RoundPhase::Consensus, "c", "m"))
            .unwrap();
        round
            .set_summary(Synthesis::new(&moderator, RoundPhase::Summary, "s", "m"))
            .unwrap();
        round.complete().unwrap();
        assert!(round.is_completed());

        let late = Statement::from_response(&persona("a"), RoundPhase::Initial, "late", "m");
        assert_eq!(round.append_statement(late).unwrap_err(), DomainError::RoundClosed(1));
    }

    #[test]
    fn test_complete_derives_issue_mentions() {
        let mut round = round();
        let text = "ISSUES:\n1. Slow hiring!";
        round
            .append_statement(Statement::from_response(&persona("a"), RoundPhase::Initial, text, "m"))
            .unwrap();
        round
            .append_statement(Statement::from_response(&persona("b"), RoundPhase::Initial, "ISSUES:\n- slow   hiring", "m"))
            .unwrap();
        round
            .append_statement(Statement::degraded(&persona("b"), RoundPhase::InteractiveFirst, "boom"))
            .unwrap();
        let moderator = persona("mod");
        round
            .set_consensus(Synthesis::new(&moderator, RoundPhase::Consensus, "c", "m"))
            .unwrap();
        round
            .set_summary(Synthesis::new(&moderator, RoundPhase::Summary, "s", "m"))
            .unwrap();
        round.complete().unwrap();

        let personas = round.issue_mentions.get("slow hiring").unwrap();
        assert_eq!(personas.len(), 2);
        assert_eq!(round.degraded_count(), 1);
    }

    #[test]
    fn test_fail_keeps_statements() {
        let mut round = round();
        round
            .append_statement(Statement::from_response(&persona("a"), RoundPhase::Initial, "x", "m"))
            .unwrap();
        round.fail("consensus failed");
        assert!(round.is_failed());
        assert_eq!(round.statements.len(), 1);
        assert!(round.reset().is_err());
    }
}
