//! Organization context handed to every persona alongside the topic

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form description of the organization under discussion (Value Object)
///
/// Well-known keys get a readable label in prompts and reports; any other key
/// is rendered as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgContext(BTreeMap<String, Value>);

impl OrgContext {
    pub const COMPANY_SIZE: &'static str = "company_size";
    pub const INDUSTRY: &'static str = "industry";
    pub const DEVELOPMENT_STAGE: &'static str = "development_stage";
    pub const CURRENT_CHALLENGES: &'static str = "current_challenges";
    pub const TEAM_STRUCTURE: &'static str = "team_structure";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    fn label(key: &str) -> String {
        match key {
            Self::COMPANY_SIZE => "Company size".to_string(),
            Self::INDUSTRY => "Industry".to_string(),
            Self::DEVELOPMENT_STAGE => "Development stage".to_string(),
            Self::CURRENT_CHALLENGES => "Current challenges".to_string(),
            Self::TEAM_STRUCTURE => "Team structure".to_string(),
            other => other.replace('_', " "),
        }
    }

    fn render_value(key: &str, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Number(n) if key == Self::COMPANY_SIZE => format!("{} people", n),
            other => other.to_string(),
        }
    }

    /// Render as a bullet list for prompts; empty context yields a placeholder line
    pub fn format_for_prompt(&self) -> String {
        if self.0.is_empty() {
            return "- (no organization details provided)".to_string();
        }
        self.0
            .iter()
            .map(|(k, v)| format!("- {}: {}", Self::label(k), Self::render_value(k, v)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<BTreeMap<String, Value>> for OrgContext {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
