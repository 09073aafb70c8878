//! Persona profile and its LLM settings

use crate::providers::ProviderKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which LLM a persona talks through, and how patiently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Per-attempt timeout
    pub timeout_secs: u64,
    /// Total attempts per call, including the first (0 is treated as 1)
    pub retry_count: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 30,
            retry_count: 3,
        }
    }
}

impl LlmSettings {
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn attempts(&self) -> u32 {
        self.retry_count.max(1)
    }
}

/// Where a persona sits in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaKind {
    /// Invited to every session by default
    Basic,
    /// Joins when the judge recommends it or the user asks for it
    Supplementary,
    /// Moderates rounds; judges and extracts by default
    Coordinator,
}

impl PersonaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaKind::Basic => "basic",
            PersonaKind::Supplementary => "supplementary",
            PersonaKind::Coordinator => "coordinator",
        }
    }
}

/// A configured reasoning identity (Value Object)
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaProfile {
    pub id: String,
    pub name: String,
    pub role: String,
    pub kind: PersonaKind,
    pub perspective: String,
    pub expertise: Vec<String>,
    /// Character brief; opaque to the orchestration layer
    pub system_prompt: String,
    pub llm: LlmSettings,
}

impl PersonaProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            kind: PersonaKind::Basic,
            perspective: String::new(),
            expertise: Vec::new(),
            system_prompt: String::new(),
            llm: LlmSettings::default(),
        }
    }

    pub fn with_kind(mut self, kind: PersonaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_perspective(mut self, perspective: impl Into<String>) -> Self {
        self.perspective = perspective.into();
        self
    }

    pub fn with_expertise<I, S>(mut self, expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = expertise.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_llm(mut self, llm: LlmSettings) -> Self {
        self.llm = llm;
        self
    }

    /// "Name (Role)" label used in prompts and reports
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.role)
    }
}
