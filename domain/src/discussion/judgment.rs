//! Sufficiency judgments and the convergence policy behind them

use crate::findings::category::IssueCategory;
use crate::parsing::JudgeAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// When the round loop should stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergencePolicy {
    /// Score (0-100) at or above which evidence counts as sufficient
    pub sufficiency_threshold: f64,
    /// Hard cap on the number of rounds in one session
    pub max_rounds: u32,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            sufficiency_threshold: 75.0,
            max_rounds: 3,
        }
    }
}

impl ConvergencePolicy {
    pub fn new(sufficiency_threshold: f64, max_rounds: u32) -> Self {
        Self {
            sufficiency_threshold,
            max_rounds,
        }
    }

    /// Another round runs only while the score is short of the threshold
    /// and the round cap has not been reached.
    pub fn needs_additional_round(&self, score: f64, round_count: u32) -> bool {
        score < self.sufficiency_threshold && round_count < self.max_rounds
    }
}

/// The judge's verdict on the evidence after one round (Value Object)
///
/// Recorded exactly once per judged round and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyJudgment {
    pub round_id: u32,
    pub overall_score: f64,
    /// Coverage per category; every category is present, uncovered ones at 0
    pub category_coverage: BTreeMap<IssueCategory, f64>,
    #[serde(default)]
    pub missing_areas: Vec<String>,
    #[serde(default)]
    pub recommended_personas: Vec<String>,
    pub needs_additional_round: bool,
    #[serde(default)]
    pub reasoning: String,
    /// Set when the judge could not be consulted and the stop verdict was imposed
    #[serde(default)]
    pub fail_closed: bool,
    pub judged_at: DateTime<Utc>,
}

impl SufficiencyJudgment {
    /// Turn a parsed judge reply into a judgment.
    ///
    /// The continue flag is derived from the policy alone; any flag the judge
    /// itself returned is ignored.
    pub fn from_assessment(
        round_id: u32,
        assessment: JudgeAssessment,
        policy: &ConvergencePolicy,
    ) -> Self {
        let overall_score = assessment.overall_score.clamp(0.0, 100.0);
        let category_coverage = IssueCategory::ALL
            .iter()
            .map(|c| {
                let value = assessment
                    .category_coverage
                    .get(c)
                    .copied()
                    .unwrap_or(0.0)
                    .clamp(0.0, 100.0);
                (*c, value)
            })
            .collect();

        Self {
            round_id,
            overall_score,
            category_coverage,
            missing_areas: assessment.missing_areas,
            recommended_personas: assessment.recommended_personas,
            needs_additional_round: policy.needs_additional_round(overall_score, round_id),
            reasoning: assessment.reasoning,
            fail_closed: false,
            judged_at: Utc::now(),
        }
    }

    /// Judgment recorded when the judge is unavailable: recommend stopping.
    pub fn fail_closed(round_id: u32, reason: impl Into<String>) -> Self {
        Self {
            round_id,
            overall_score: 0.0,
            category_coverage: IssueCategory::ALL.iter().map(|c| (*c, 0.0)).collect(),
            missing_areas: Vec::new(),
            recommended_personas: Vec::new(),
            needs_additional_round: false,
            reasoning: reason.into(),
            fail_closed: true,
            judged_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(score: f64) -> JudgeAssessment {
        JudgeAssessment {
            overall_score: score,
            category_coverage: [(IssueCategory::Communication, 80.0)].into_iter().collect(),
            missing_areas: vec!["hiring".to_string()],
            recommended_personas: vec!["product_owner".to_string()],
            reasoning: "ok".to_string(),
        }
    }

    #[test]
    fn test_policy_threshold_is_strict() {
        let policy = ConvergencePolicy::new(75.0, 3);
        assert!(policy.needs_additional_round(74.9, 1));
        assert!(!policy.needs_additional_round(75.0, 1));
    }

    #[test]
    fn test_forced_stop_at_max_rounds_regardless_of_score() {
        let policy = ConvergencePolicy::new(75.0, 3);
        for score in [0.0, 10.0, 74.0, 100.0] {
            assert!(!policy.needs_additional_round(score, 3));
        }
    }

    #[test]
    fn test_from_assessment_fills_every_category() {
        let policy = ConvergencePolicy::default();
        let judgment = SufficiencyJudgment::from_assessment(1, assessment(40.0), &policy);
        assert_eq!(judgment.category_coverage.len(), IssueCategory::ALL.len());
        assert_eq!(judgment.category_coverage[&IssueCategory::Communication], 80.0);
        assert_eq!(judgment.category_coverage[&IssueCategory::TalentManagement], 0.0);
        assert!(judgment.needs_additional_round);
        assert!(!judgment.fail_closed);
    }

    #[test]
    fn test_from_assessment_clamps_score() {
        let policy = ConvergencePolicy::default();
        let judgment = SufficiencyJudgment::from_assessment(1, assessment(140.0), &policy);
        assert_eq!(judgment.overall_score, 100.0);
        assert!(!judgment.needs_additional_round);
    }

    #[test]
    fn test_fail_closed_recommends_stop() {
        let judgment = SufficiencyJudgment::fail_closed(2, "judge timed out");
        assert!(judgment.fail_closed);
        assert!(!judgment.needs_additional_round);
        assert!(judgment.category_coverage.values().all(|v| *v == 0.0));
        assert_eq!(judgment.category_coverage.len(), IssueCategory::ALL.len());
    }

    #[test]
    fn test_serde_uses_category_names_as_keys() {
        let judgment = SufficiencyJudgment::fail_closed(1, "x");
        let json = serde_json::to_value(&judgment).unwrap();
        assert!(json["category_coverage"].get("talent_management").is_some());
    }
}
