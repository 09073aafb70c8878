//! Merging per-round extraction output into session-wide findings.
//!
//! Each completed round is extracted separately. The merger folds those
//! batches into one list of issues keyed by normalized title and category,
//! re-numbers them, and re-points solutions at the merged ids. Candidates that
//! cannot be placed (unknown category, dangling issue reference) are dropped
//! and logged.

use super::category::{IssueCategory, Priority};
use super::entities::{IdentifiedIssue, ProposedSolution};
use crate::core::string::normalize_key;
use crate::discussion::round::Round;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Issue as returned by the extraction call, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IssueCandidate {
    /// Batch-local reference used by solutions in the same batch
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub root_causes: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub affected_areas: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub mentioned_by: Vec<String>,
}

/// Solution as returned by the extraction call, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SolutionCandidate {
    #[serde(default, alias = "issue_ref", deserialize_with = "lenient_string")]
    pub issue_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub implementation_steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub required_resources: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timeline: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub expected_outcomes: Vec<String>,
}

/// Output of one extraction call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractionBatch {
    #[serde(default)]
    pub issues: Vec<IssueCandidate>,
    #[serde(default)]
    pub solutions: Vec<SolutionCandidate>,
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(value_to_string).collect(),
        other => value_to_string(other).into_iter().collect(),
    })
}

fn push_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Accumulates extraction batches across rounds
#[derive(Debug, Default)]
pub struct FindingsMerger {
    issues: Vec<IdentifiedIssue>,
    by_key: HashMap<String, usize>,
    solutions: Vec<ProposedSolution>,
    solution_keys: HashSet<(String, String)>,
    dropped_issues: usize,
    dropped_solutions: usize,
}

impl FindingsMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped_issues(&self) -> usize {
        self.dropped_issues
    }

    pub fn dropped_solutions(&self) -> usize {
        self.dropped_solutions
    }

    /// Fold the extraction output of one round into the merged set
    pub fn add_round(&mut self, round: &Round, batch: ExtractionBatch) {
        let mut local_refs: HashMap<String, String> = HashMap::new();

        for (index, candidate) in batch.issues.into_iter().enumerate() {
            let local_ref = candidate
                .id
                .clone()
                .unwrap_or_else(|| (index + 1).to_string());
            match self.merge_issue(round, candidate) {
                Some(merged_id) => {
                    local_refs.insert(local_ref.trim().to_lowercase(), merged_id);
                }
                None => self.dropped_issues += 1,
            }
        }

        for candidate in batch.solutions {
            if !self.merge_solution(round.id, &local_refs, candidate) {
                self.dropped_solutions += 1;
            }
        }
    }

    fn merge_issue(&mut self, round: &Round, candidate: IssueCandidate) -> Option<String> {
        let title = candidate.title.trim().to_string();
        let title_key = normalize_key(&title);
        if title_key.is_empty() {
            warn!(round = round.id, "Dropping extracted issue without a title");
            return None;
        }
        let Some(category) = IssueCategory::parse(&candidate.category) else {
            warn!(
                round = round.id,
                title = %title,
                category = %candidate.category,
                "Dropping extracted issue with unknown category"
            );
            return None;
        };

        let mentioned_by = Self::mentions_for(round, &title_key, &candidate.mentioned_by);
        let priority = candidate
            .priority
            .as_deref()
            .map(Priority::parse_lenient)
            .unwrap_or_default();
        let key = format!("{}|{}", title_key, category.as_str());

        if let Some(&idx) = self.by_key.get(&key) {
            let issue = &mut self.issues[idx];
            issue.mentioned_by.extend(mentioned_by);
            issue.priority = issue.priority.max_urgency(priority);
            push_unique(&mut issue.root_causes, candidate.root_causes);
            push_unique(&mut issue.affected_areas, candidate.affected_areas);
            if issue.description.is_empty()
                && let Some(description) = candidate.description
            {
                issue.description = description;
            }
            return Some(issue.id.clone());
        }

        let id = format!("ISSUE-{:03}", self.issues.len() + 1);
        let mut issue = IdentifiedIssue {
            id: id.clone(),
            title,
            description: candidate.description.unwrap_or_default(),
            category,
            priority,
            root_causes: Vec::new(),
            affected_areas: Vec::new(),
            mentioned_by,
        };
        push_unique(&mut issue.root_causes, candidate.root_causes);
        push_unique(&mut issue.affected_areas, candidate.affected_areas);
        self.by_key.insert(key, self.issues.len());
        self.issues.push(issue);
        Some(id)
    }

    /// Personas credited with an issue: the ids the extractor named (limited
    /// to the round's participants) plus everyone whose raw fragment matches.
    fn mentions_for(round: &Round, title_key: &str, named: &[String]) -> BTreeSet<String> {
        let mut personas: BTreeSet<String> = named
            .iter()
            .map(|p| p.trim())
            .filter(|p| round.is_participant(p))
            .map(str::to_string)
            .collect();
        for (fragment, authors) in &round.issue_mentions {
            if contains_words(fragment, title_key) || contains_words(title_key, fragment) {
                personas.extend(authors.iter().cloned());
            }
        }
        personas
    }

    fn resolve_issue(&self, local_refs: &HashMap<String, String>, raw: &str) -> Option<String> {
        let reference = raw.trim().to_lowercase();
        if let Some(id) = local_refs.get(&reference) {
            return Some(id.clone());
        }
        self.issues
            .iter()
            .find(|i| i.id.to_lowercase() == reference)
            .map(|i| i.id.clone())
    }

    fn merge_solution(
        &mut self,
        round_id: u32,
        local_refs: &HashMap<String, String>,
        candidate: SolutionCandidate,
    ) -> bool {
        let title = candidate.title.trim().to_string();
        let reference = candidate.issue_id.unwrap_or_default();
        let Some(issue_id) = self.resolve_issue(local_refs, &reference) else {
            warn!(
                round = round_id,
                title = %title,
                issue_ref = %reference,
                "Dropping orphan solution"
            );
            return false;
        };
        let title_key = normalize_key(&title);
        if title_key.is_empty() {
            warn!(round = round_id, issue = %issue_id, "Dropping extracted solution without a title");
            return false;
        }
        if !self.solution_keys.insert((issue_id.clone(), title_key)) {
            // same remedy proposed again in a later round
            return true;
        }

        let mut solution = ProposedSolution {
            id: format!("SOL-{:03}", self.solutions.len() + 1),
            issue_id,
            title,
            description: candidate.description.unwrap_or_default(),
            implementation_steps: Vec::new(),
            required_resources: Vec::new(),
            timeline: candidate.timeline.unwrap_or_default(),
            risks: Vec::new(),
            expected_outcomes: Vec::new(),
        };
        push_unique(&mut solution.implementation_steps, candidate.implementation_steps);
        push_unique(&mut solution.required_resources, candidate.required_resources);
        push_unique(&mut solution.risks, candidate.risks);
        push_unique(&mut solution.expected_outcomes, candidate.expected_outcomes);
        self.solutions.push(solution);
        true
    }

    pub fn finish(self) -> (Vec<IdentifiedIssue>, Vec<ProposedSolution>) {
        (self.issues, self.solutions)
    }
}

/// Split solutions into those referencing a known issue and orphans
pub fn drop_orphans(
    issues: &[IdentifiedIssue],
    solutions: Vec<ProposedSolution>,
) -> (Vec<ProposedSolution>, Vec<ProposedSolution>) {
    let ids: HashSet<&str> = issues.iter().map(|i| i.id.as_str()).collect();
    solutions
        .into_iter()
        .partition(|s| ids.contains(s.issue_id.as_str()))
}

/// Whether `needle`'s words appear as a contiguous run of whole words in
/// `haystack`. Both are expected to be normalized keys.
fn contains_words(haystack: &str, needle: &str) -> bool {
    let hay: Vec<&str> = haystack.split_whitespace().collect();
    let needle: Vec<&str> = needle.split_whitespace().collect();
    !needle.is_empty()
        && needle.len() <= hay.len()
        && hay.windows(needle.len()).any(|window| window == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discussion::phase::RoundPhase;
    use crate::discussion::statement::{Statement, Synthesis};
    use crate::persona::profile::PersonaProfile;

    fn completed_round(id: u32, statements: &[(&str, &str)]) -> Round {
        let participants: Vec<String> = statements.iter().map(|(p, _)| p.to_string()).collect();
        let mut round = Round::new(id, participants, "coordinator").unwrap();
        for (persona, text) in statements {
            let profile = PersonaProfile::new(*persona, *persona, "role");
            round
                .append_statement(Statement::from_response(&profile, RoundPhase::Initial, *text, "m"))
                .unwrap();
        }
        let moderator = PersonaProfile::new("coordinator", "Facilitator", "Facilitator");
        round
            .set_consensus(Synthesis::new(&moderator, RoundPhase::Consensus, "c", "m"))
            .unwrap();
        round
            .set_summary(Synthesis::new(&moderator, RoundPhase::Summary, "s", "m"))
            .unwrap();
        round.complete().unwrap();
        round
    }

    fn batch(json: &str) -> ExtractionBatch {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lenient_candidate_fields() {
        let batch = batch(
            r#"{"issues":[{"id":1,"title":"Slow hiring","category":"people","root_causes":"no referral program","mentioned_by":null}],
                "solutions":[{"issue_ref":1,"title":"Referral bonus","timeline":null}]}"#,
        );
        assert_eq!(batch.issues[0].id.as_deref(), Some("1"));
        assert_eq!(batch.issues[0].root_causes, vec!["no referral program"]);
        assert!(batch.issues[0].mentioned_by.is_empty());
        assert_eq!(batch.solutions[0].issue_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_merges_duplicates_across_rounds() {
        let round1 = completed_round(1, &[("startup_pm", "ISSUES:\n1. Slow hiring")]);
        let round2 = completed_round(2, &[("tech_lead", "ISSUES:\n1. slow hiring!!")]);

        let mut merger = FindingsMerger::new();
        merger.add_round(
            &round1,
            batch(r#"{"issues":[{"id":"a","title":"Slow hiring","category":"talent_management","priority":"medium"}]}"#),
        );
        merger.add_round(
            &round2,
            batch(r#"{"issues":[{"id":"x","title":"Slow  Hiring.","category":"talent","priority":"high","root_causes":["budget freeze"]}],
                     "solutions":[{"issue_id":"x","title":"Contract recruiter"}]}"#),
        );

        let (issues, solutions) = merger.finish();
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.id, "ISSUE-001");
        assert_eq!(issue.priority, Priority::High);
        assert_eq!(issue.root_causes, vec!["budget freeze"]);
        let mentioned: Vec<&str> = issue.mentioned_by.iter().map(String::as_str).collect();
        assert_eq!(mentioned, vec!["startup_pm", "tech_lead"]);

        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].issue_id, "ISSUE-001");
    }

    #[test]
    fn test_same_title_different_category_is_distinct() {
        let round = completed_round(1, &[("a", "text")]);
        let mut merger = FindingsMerger::new();
        merger.add_round(
            &round,
            batch(r#"{"issues":[{"title":"Handoffs","category":"process"},{"title":"Handoffs","category":"communication"}]}"#),
        );
        let (issues, _) = merger.finish();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].id, "ISSUE-002");
    }

    #[test]
    fn test_unknown_category_and_orphans_are_dropped() {
        let round = completed_round(1, &[("a", "text")]);
        let mut merger = FindingsMerger::new();
        merger.add_round(
            &round,
            batch(
                r#"{"issues":[{"id":"1","title":"Budget","category":"finance"},{"id":"2","title":"Silos","category":"communication"}],
                    "solutions":[{"issue_id":"1","title":"Cut costs"},{"issue_id":"2","title":"Guilds"},{"issue_id":"99","title":"Nothing"}]}"#,
            ),
        );
        assert_eq!(merger.dropped_issues(), 1);
        assert_eq!(merger.dropped_solutions(), 2);
        let (issues, solutions) = merger.finish();
        assert_eq!(issues.len(), 1);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].issue_id, issues[0].id);
    }

    #[test]
    fn test_named_mentions_limited_to_participants() {
        let round = completed_round(1, &[("a", "text")]);
        let mut merger = FindingsMerger::new();
        merger.add_round(
            &round,
            batch(r#"{"issues":[{"title":"Silos","category":"communication","mentioned_by":["a","ghost"]}]}"#),
        );
        let (issues, _) = merger.finish();
        assert_eq!(issues[0].mentioned_by.len(), 1);
        assert!(issues[0].mentioned_by.contains("a"));
    }

    #[test]
    fn test_fragment_mentions_match_whole_words_only() {
        let round = completed_round(
            1,
            &[
                ("a", "ISSUES:\n1. IT"),
                ("b", "ISSUES:\n1. Unclear priorities"),
                ("c", "ISSUES:\n1. Unclear priorities across teams"),
            ],
        );
        let mut merger = FindingsMerger::new();
        merger.add_round(
            &round,
            batch(r#"{"issues":[{"title":"Unclear priorities","category":"communication"}]}"#),
        );
        let (issues, _) = merger.finish();
        let credited: Vec<&str> = issues[0].mentioned_by.iter().map(String::as_str).collect();
        assert_eq!(credited, vec!["b", "c"]);
    }

    #[test]
    fn test_contains_words() {
        assert!(contains_words("unclear priorities across teams", "unclear priorities"));
        assert!(contains_words("it", "it"));
        assert!(!contains_words("unclear priorities", "it"));
        assert!(!contains_words("priorities unclear", "unclear priorities"));
        assert!(!contains_words("anything", ""));
    }

    #[test]
    fn test_solution_can_reference_merged_id_from_earlier_round() {
        let round1 = completed_round(1, &[("a", "text")]);
        let round2 = completed_round(2, &[("a", "text")]);
        let mut merger = FindingsMerger::new();
        merger.add_round(&round1, batch(r#"{"issues":[{"title":"Silos","category":"communication"}]}"#));
        merger.add_round(&round2, batch(r#"{"solutions":[{"issue_id":"issue-001","title":"Guilds"}]}"#));
        let (_, solutions) = merger.finish();
        assert_eq!(solutions[0].issue_id, "ISSUE-001");
    }

    #[test]
    fn test_drop_orphans_partitions() {
        let issues = vec![IdentifiedIssue {
            id: "ISSUE-001".to_string(),
            title: "t".to_string(),
            description: String::new(),
            category: IssueCategory::Communication,
            priority: Priority::Low,
            root_causes: vec![],
            affected_areas: vec![],
            mentioned_by: BTreeSet::new(),
        }];
        let solution = |issue: &str| ProposedSolution {
            id: "SOL-001".to_string(),
            issue_id: issue.to_string(),
            title: "s".to_string(),
            description: String::new(),
            implementation_steps: vec![],
            required_resources: vec![],
            timeline: String::new(),
            risks: vec![],
            expected_outcomes: vec![],
        };
        let (kept, orphans) = drop_orphans(&issues, vec![solution("ISSUE-001"), solution("ISSUE-404")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(orphans.len(), 1);
    }
}
