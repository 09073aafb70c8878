//! Extract Findings use case
//!
//! Turns the transcripts of all completed rounds into the session's final
//! structured issues and solutions: one extraction call per round, folded
//! into a [`FindingsMerger`].

use crate::ports::llm_gateway::{CallPurpose, LlmGateway, ProviderError};
use crate::use_cases::invocation::{InvocationGateway, PromptContext};
use roundtable_domain::{
    FindingsMerger, IdentifiedIssue, PersonaCatalog, PromptTemplate, ProposedSolution, Session,
    parse_extraction_response,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction of round {round} failed: {reason}")]
    Failed { round: u32, reason: String },

    #[error("Analyst '{0}' is not in the persona catalog")]
    UnknownAnalyst(String),

    #[error("Extraction cancelled")]
    Cancelled,
}

/// Structured findings of a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub issues: Vec<IdentifiedIssue>,
    pub solutions: Vec<ProposedSolution>,
}

pub struct FindingsExtractor<G: LlmGateway + 'static> {
    invoker: InvocationGateway<G>,
    catalog: Arc<PersonaCatalog>,
    analyst_id: String,
}

impl<G: LlmGateway + 'static> FindingsExtractor<G> {
    pub fn new(
        invoker: InvocationGateway<G>,
        catalog: Arc<PersonaCatalog>,
        analyst_id: impl Into<String>,
    ) -> Self {
        Self {
            invoker,
            catalog,
            analyst_id: analyst_id.into(),
        }
    }

    /// Extract and merge findings over every completed round, in round order.
    pub async fn extract(&self, session: &Session) -> Result<Findings, ExtractionError> {
        let analyst = self
            .catalog
            .get(&self.analyst_id)
            .ok_or_else(|| ExtractionError::UnknownAnalyst(self.analyst_id.clone()))?;

        let mut merger = FindingsMerger::new();
        for round in session.rounds().iter().filter(|r| r.is_completed()) {
            let context = PromptContext::new(
                PromptTemplate::extraction_system(),
                PromptTemplate::extraction_prompt(session.topic(), round),
            );
            let response = self
                .invoker
                .complete(analyst, CallPurpose::Extraction, &context, analyst.llm.timeout())
                .await
                .map_err(|e| match e {
                    ProviderError::Cancelled => ExtractionError::Cancelled,
                    other => ExtractionError::Failed {
                        round: round.id,
                        reason: other.to_string(),
                    },
                })?;

            let batch =
                parse_extraction_response(&response.text).map_err(|e| ExtractionError::Failed {
                    round: round.id,
                    reason: e.to_string(),
                })?;
            merger.add_round(round, batch);
        }

        if merger.dropped_issues() > 0 || merger.dropped_solutions() > 0 {
            warn!(
                dropped_issues = merger.dropped_issues(),
                dropped_solutions = merger.dropped_solutions(),
                "Some extracted findings were discarded"
            );
        }

        let (issues, solutions) = merger.finish();
        info!(
            issues = issues.len(),
            solutions = solutions.len(),
            "Findings extracted"
        );
        Ok(Findings { issues, solutions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::testing::{ScriptedGateway, extraction_json, reply, statement_text};
    use roundtable_domain::{
        COORDINATOR_ID, LlmSettings, OrgContext, PersonaProfile, Priority, RoundPhase, Statement,
        SessionStatus, Synthesis,
    };
    use serde_json::json;

    fn complete_round(session: &mut Session, participants: &[&str]) {
        let round = session
            .begin_round(participants.iter().map(|p| p.to_string()).collect(), COORDINATOR_ID)
            .unwrap();
        for persona in participants {
            let profile = PersonaProfile::new(*persona, *persona, "role");
            round
                .append_statement(Statement::from_response(
                    &profile,
                    RoundPhase::Initial,
                    statement_text(persona),
                    "m",
                ))
                .unwrap();
        }
        let moderator = PersonaProfile::new(COORDINATOR_ID, "Facilitator", "Facilitator");
        round
            .set_consensus(Synthesis::new(&moderator, RoundPhase::Consensus, "c", "m"))
            .unwrap();
        round
            .set_summary(Synthesis::new(&moderator, RoundPhase::Summary, "s", "m"))
            .unwrap();
        round.complete().unwrap();
    }

    fn extractor(gateway: Arc<ScriptedGateway>) -> FindingsExtractor<ScriptedGateway> {
        FindingsExtractor::new(
            InvocationGateway::new(gateway, 2),
            Arc::new(PersonaCatalog::builtin(&LlmSettings::default().with_retry_count(1))),
            COORDINATOR_ID,
        )
    }

    #[tokio::test]
    async fn test_findings_merge_across_rounds() {
        let mut session = Session::new("Hiring is too slow", OrgContext::new());
        complete_round(&mut session, &["tech_lead"]);
        session.transition(SessionStatus::Judging(1)).unwrap();
        complete_round(&mut session, &["tech_lead", "scrum_master"]);

        let gateway = Arc::new(ScriptedGateway::new(|_, call| {
            if call == 1 {
                Ok(reply(extraction_json()))
            } else {
                let second = json!({
                    "issues": [
                        {"id": "A", "title": "slow hiring pipeline", "category": "talent_management", "priority": "critical"},
                        {"id": "B", "title": "Unclear ownership", "category": "communication"},
                        {"id": "C", "title": "Vibes", "category": "astrology"}
                    ],
                    "solutions": [
                        {"issue_id": "B", "title": "RACI chart"},
                        {"issue_id": "C", "title": "Horoscope"}
                    ]
                });
                Ok(reply(second.to_string()))
            }
        }));

        let findings = extractor(Arc::clone(&gateway)).extract(&session).await.unwrap();

        assert_eq!(gateway.call_count(), 2);
        let titles: Vec<&str> = findings.issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Slow hiring pipeline", "Unclear ownership"]);
        assert_eq!(findings.issues[0].id, "ISSUE-001");
        assert_eq!(findings.issues[0].priority, Priority::Critical);
        assert!(findings.issues[0].mentioned_by.contains("scrum_master"));
        assert!(findings.issues[0].mentioned_by.contains("tech_lead"));

        let solution_refs: Vec<(&str, &str)> = findings
            .solutions
            .iter()
            .map(|s| (s.id.as_str(), s.issue_id.as_str()))
            .collect();
        assert_eq!(
            solution_refs,
            vec![("SOL-001", "ISSUE-001"), ("SOL-002", "ISSUE-002")]
        );
    }

    #[tokio::test]
    async fn test_malformed_reply_is_extraction_failure() {
        let mut session = Session::new("t", OrgContext::new());
        complete_round(&mut session, &["tech_lead"]);

        let gateway = Arc::new(ScriptedGateway::new(|_, _| Ok(reply("no json here"))));
        let err = extractor(gateway).extract(&session).await.unwrap_err();

        assert!(matches!(err, ExtractionError::Failed { round: 1, .. }));
    }

    #[tokio::test]
    async fn test_open_rounds_are_not_extracted() {
        let mut session = Session::new("t", OrgContext::new());
        session
            .begin_round(vec!["tech_lead".to_string()], COORDINATOR_ID)
            .unwrap();

        let gateway = Arc::new(ScriptedGateway::new(|_, _| Ok(reply(extraction_json()))));
        let findings = extractor(Arc::clone(&gateway)).extract(&session).await.unwrap();

        assert_eq!(gateway.call_count(), 0);
        assert_eq!(findings, Findings::default());
    }
}
