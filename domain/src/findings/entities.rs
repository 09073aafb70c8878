//! Final issue and solution entities

use super::category::{IssueCategory, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A deduplicated organizational issue (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedIssue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: IssueCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub root_causes: Vec<String>,
    #[serde(default)]
    pub affected_areas: Vec<String>,
    /// Personas that raised the issue in any round
    #[serde(default)]
    pub mentioned_by: BTreeSet<String>,
}

/// A remedy for exactly one identified issue (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedSolution {
    pub id: String,
    pub issue_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub implementation_steps: Vec<String>,
    #[serde(default)]
    pub required_resources: Vec<String>,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub expected_outcomes: Vec<String>,
}
