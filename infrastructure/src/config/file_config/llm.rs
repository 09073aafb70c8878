//! LLM configuration from TOML (`[default_llm]` and `[personas.<id>]` sections)
//!
//! Provider names stay strings here so that a typo becomes a validation
//! issue with a field path instead of an opaque deserialization error.

use roundtable_domain::validation::{ConfigIssue, ConfigIssueCode};
use roundtable_domain::{LlmSettings, ProviderKind};
use serde::{Deserialize, Serialize};

/// Default LLM settings applied to every persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    /// Total attempts per call, including the first
    pub retry_count: u32,
}

impl Default for FileLlmConfig {
    fn default() -> Self {
        let defaults = LlmSettings::default();
        Self {
            provider: defaults.provider.to_string(),
            model: defaults.model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            timeout_secs: defaults.timeout_secs,
            retry_count: defaults.retry_count,
        }
    }
}

impl FileLlmConfig {
    /// Convert to domain settings, collecting issues.
    ///
    /// An unknown provider falls back to the built-in default so the rest of
    /// the configuration can still be checked.
    pub fn to_settings(&self) -> (LlmSettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let field = "default_llm";

        let provider = parse_provider(&self.provider, field, &mut issues).unwrap_or_default();
        check_model(&self.model, field, &mut issues);
        check_temperature(self.temperature, field, &mut issues);
        check_timeout(self.timeout_secs, field, &mut issues);

        let mut settings = LlmSettings::default()
            .with_provider(provider)
            .with_model(self.model.trim())
            .with_temperature(self.temperature)
            .with_timeout_secs(self.timeout_secs)
            .with_retry_count(self.retry_count);
        settings.max_tokens = self.max_tokens;

        (settings, issues)
    }
}

/// Per-persona override; unset fields inherit from `[default_llm]`
///
/// ```toml
/// [personas.tech_lead]
/// provider = "anthropic"
/// model = "claude-sonnet-4-20250514"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersonaOverride {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub retry_count: Option<u32>,
}

impl FilePersonaOverride {
    /// Layer this override on top of `base`, collecting issues under
    /// `personas.<id>`.
    pub fn apply(&self, id: &str, base: &LlmSettings) -> (LlmSettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let field = format!("personas.{}", id);
        let mut settings = base.clone();

        if let Some(provider) = &self.provider
            && let Some(kind) = parse_provider(provider, &field, &mut issues)
        {
            settings.provider = kind;
        }
        if let Some(model) = &self.model {
            check_model(model, &field, &mut issues);
            settings.model = model.trim().to_string();
        }
        if let Some(temperature) = self.temperature {
            check_temperature(temperature, &field, &mut issues);
            settings.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = Some(max_tokens);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            check_timeout(timeout_secs, &field, &mut issues);
            settings.timeout_secs = timeout_secs;
        }
        if let Some(retry_count) = self.retry_count {
            settings.retry_count = retry_count;
        }

        (settings, issues)
    }
}

fn parse_provider(value: &str, field: &str, issues: &mut Vec<ConfigIssue>) -> Option<ProviderKind> {
    match value.parse::<ProviderKind>() {
        Ok(kind) => Some(kind),
        Err(_) => {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnknownProvider {
                    field: format!("{}.provider", field),
                    value: value.to_string(),
                },
                format!(
                    "{}.provider: unknown provider '{}' (expected openai or anthropic)",
                    field, value
                ),
            ));
            None
        }
    }
}

fn check_model(model: &str, field: &str, issues: &mut Vec<ConfigIssue>) {
    if model.trim().is_empty() {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::EmptyModel {
                field: format!("{}.model", field),
            },
            format!("{}.model: model name must not be empty", field),
        ));
    }
}

fn check_temperature(temperature: f32, field: &str, issues: &mut Vec<ConfigIssue>) {
    if !(0.0..=2.0).contains(&temperature) {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::OutOfRange {
                field: format!("{}.temperature", field),
                value: temperature as f64,
            },
            format!("{}.temperature: {} is outside 0..=2", field, temperature),
        ));
    }
}

fn check_timeout(timeout_secs: u64, field: &str, issues: &mut Vec<ConfigIssue>) {
    if timeout_secs == 0 {
        issues.push(ConfigIssue::error(
            ConfigIssueCode::OutOfRange {
                field: format!("{}.timeout_secs", field),
                value: 0.0,
            },
            format!("{}.timeout_secs: must be at least 1", field),
        ));
    }
}
