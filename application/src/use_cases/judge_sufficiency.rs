//! Judge Sufficiency use case
//!
//! Scores the evidence gathered after a round and decides, under the
//! convergence policy, whether another round is warranted. When the judge
//! cannot be consulted the verdict fails closed (stop) unless escalation is
//! configured.

use crate::ports::llm_gateway::{CallPurpose, LlmGateway, ProviderError};
use crate::use_cases::invocation::{InvocationGateway, PromptContext};
use roundtable_domain::{
    ConvergencePolicy, PersonaCatalog, PersonaKind, PersonaProfile, PromptTemplate, Session,
    SufficiencyJudgment, parse_judge_response,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum JudgmentError {
    #[error("Sufficiency judgment for round {round} failed: {reason}")]
    Failed { round: u32, reason: String },

    #[error("Judge '{0}' is not in the persona catalog")]
    UnknownJudge(String),

    #[error("Judgment cancelled")]
    Cancelled,
}

/// Sufficiency judge backed by one persona
pub struct SufficiencyJudge<G: LlmGateway + 'static> {
    invoker: InvocationGateway<G>,
    catalog: Arc<PersonaCatalog>,
    judge_id: String,
    policy: ConvergencePolicy,
    escalate_failures: bool,
}

impl<G: LlmGateway + 'static> SufficiencyJudge<G> {
    pub fn new(
        invoker: InvocationGateway<G>,
        catalog: Arc<PersonaCatalog>,
        judge_id: impl Into<String>,
        policy: ConvergencePolicy,
    ) -> Self {
        Self {
            invoker,
            catalog,
            judge_id: judge_id.into(),
            policy,
            escalate_failures: false,
        }
    }

    pub fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate_failures = escalate;
        self
    }

    /// Judge the evidence of every round up to and including `round_id`.
    pub async fn judge(
        &self,
        session: &Session,
        round_id: u32,
    ) -> Result<SufficiencyJudgment, JudgmentError> {
        let judge = self
            .catalog
            .get(&self.judge_id)
            .ok_or_else(|| JudgmentError::UnknownJudge(self.judge_id.clone()))?;

        let rounds: Vec<_> = session
            .rounds()
            .iter()
            .filter(|r| r.id <= round_id)
            .cloned()
            .collect();
        let current = session
            .round(round_id)
            .map(|r| r.participants.as_slice())
            .unwrap_or_default();
        let candidates: Vec<&PersonaProfile> = self
            .catalog
            .iter()
            .filter(|p| p.kind != PersonaKind::Coordinator && !current.contains(&p.id))
            .collect();

        let context = PromptContext::new(
            PromptTemplate::judge_system(),
            PromptTemplate::judge_prompt(
                session.topic(),
                session.org_context(),
                &rounds,
                &candidates,
            ),
        );

        let reply = self
            .invoker
            .complete(judge, CallPurpose::Judgment, &context, judge.llm.timeout())
            .await;

        let outcome = match reply {
            Ok(response) => parse_judge_response(&response.text)
                .map_err(|e| format!("unparseable judge reply: {}", e)),
            Err(ProviderError::Cancelled) => return Err(JudgmentError::Cancelled),
            Err(e) => Err(format!("judge unavailable: {}", e)),
        };

        match outcome {
            Ok(assessment) => {
                let judgment = SufficiencyJudgment::from_assessment(round_id, assessment, &self.policy);
                info!(
                    round = round_id,
                    score = judgment.overall_score,
                    needs_additional_round = judgment.needs_additional_round,
                    "Sufficiency judged"
                );
                Ok(judgment)
            }
            Err(reason) if self.escalate_failures => {
                warn!(round = round_id, "Judgment failed: {}", reason);
                Err(JudgmentError::Failed {
                    round: round_id,
                    reason,
                })
            }
            Err(reason) => {
                warn!(round = round_id, "Judgment failed, stopping the round loop: {}", reason);
                Ok(SufficiencyJudgment::fail_closed(round_id, reason))
            }
        }
    }
}
