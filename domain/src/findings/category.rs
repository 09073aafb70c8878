//! Issue categories and priorities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of areas the discussion is expected to cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    TalentManagement,
    ProcessImprovement,
    OrganizationalScaling,
    Communication,
    TechnicalPractices,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        IssueCategory::TalentManagement,
        IssueCategory::ProcessImprovement,
        IssueCategory::OrganizationalScaling,
        IssueCategory::Communication,
        IssueCategory::TechnicalPractices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::TalentManagement => "talent_management",
            IssueCategory::ProcessImprovement => "process_improvement",
            IssueCategory::OrganizationalScaling => "organizational_scaling",
            IssueCategory::Communication => "communication",
            IssueCategory::TechnicalPractices => "technical_practices",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IssueCategory::TalentManagement => "People & Talent Management",
            IssueCategory::ProcessImprovement => "Process Improvement",
            IssueCategory::OrganizationalScaling => "Organizational Scaling",
            IssueCategory::Communication => "Communication",
            IssueCategory::TechnicalPractices => "Technical Practices",
        }
    }

    /// Lenient parse of a category label produced by an LLM.
    ///
    /// Accepts the canonical snake_case names plus common variants
    /// ("People management", "process", "org-scaling", ...).
    pub fn parse(label: &str) -> Option<Self> {
        let key: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let key = key.trim_matches('_');
        match key {
            "talent_management" | "talent" | "people" | "people_management"
            | "people_talent_management" | "hr" | "human_resources" | "hiring" => {
                Some(IssueCategory::TalentManagement)
            }
            "process_improvement" | "process" | "processes" | "workflow" | "delivery" => {
                Some(IssueCategory::ProcessImprovement)
            }
            "organizational_scaling" | "organisational_scaling" | "scaling" | "org_scaling"
            | "organization" | "organizational" | "structure" => {
                Some(IssueCategory::OrganizationalScaling)
            }
            "communication" | "communications" | "collaboration" => {
                Some(IssueCategory::Communication)
            }
            "technical_practices" | "technical" | "technology" | "tech" | "engineering"
            | "engineering_practices" => Some(IssueCategory::TechnicalPractices),
            _ => None,
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Urgency of an issue. Ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Lenient parse; anything unrecognized is `Medium`
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "critical" | "urgent" | "blocker" => Priority::Critical,
            "high" => Priority::High,
            "low" | "minor" => Priority::Low,
            _ => Priority::Medium,
        }
    }

    /// The more urgent of two priorities
    pub fn max_urgency(self, other: Priority) -> Priority {
        self.min(other)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
