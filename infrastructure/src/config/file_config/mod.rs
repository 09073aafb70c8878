//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain and application
//! types once validated.

mod discussion;
mod llm;
mod providers;
mod storage;

pub use discussion::{FileDiscussionConfig, FileInvocationConfig, MAX_ROUNDS_LIMIT};
pub use llm::{FileLlmConfig, FilePersonaOverride};
pub use providers::{FileAnthropicConfig, FileOpenAiConfig, FileProvidersConfig};
pub use storage::{FileLoggingConfig, FileStorageConfig};

use roundtable_application::DiscussionParams;
use roundtable_domain::validation::{ConfigIssue, ConfigIssueCode};
use roundtable_domain::{PersonaCatalog, PersonaKind, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Round loop settings
    pub discussion: FileDiscussionConfig,
    /// Retry pacing
    pub invocation: FileInvocationConfig,
    /// LLM settings every persona starts from
    pub default_llm: FileLlmConfig,
    /// Per-persona LLM overrides keyed by persona id
    pub personas: BTreeMap<String, FilePersonaOverride>,
    /// Provider endpoints and credentials
    pub providers: FileProvidersConfig,
    pub storage: FileStorageConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    pub fn to_params(&self) -> DiscussionParams {
        discussion::to_discussion_params(&self.discussion, &self.invocation)
    }

    /// Built-in catalog with `[default_llm]` and `[personas.*]` applied.
    ///
    /// Overrides for ids the catalog does not know are reported as warnings
    /// and skipped.
    pub fn build_catalog(&self) -> (PersonaCatalog, Vec<ConfigIssue>) {
        let (default_llm, mut issues) = self.default_llm.to_settings();
        let mut catalog = PersonaCatalog::builtin(&default_llm);

        for (id, persona_override) in &self.personas {
            if !catalog.contains(id) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownPersona {
                        field: "personas".to_string(),
                        id: id.clone(),
                    },
                    format!("[personas.{}]: no such persona, override ignored", id),
                ));
                continue;
            }
            let (settings, override_issues) = persona_override.apply(id, &default_llm);
            issues.extend(override_issues);
            catalog.set_llm(id, settings);
        }

        (catalog, issues)
    }

    /// Validate the configuration and return all detected issues.
    ///
    /// Credentials are not checked here; see [`Self::credential_issues`].
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.discussion.range_issues();
        let (catalog, catalog_issues) = self.build_catalog();
        issues.extend(catalog_issues);

        for id in &self.discussion.participants {
            if !catalog.contains(id.trim()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownPersona {
                        field: "discussion.participants".to_string(),
                        id: id.clone(),
                    },
                    format!(
                        "discussion.participants: '{}' is not in the persona catalog and will be ignored",
                        id
                    ),
                ));
            }
        }

        for (field, id) in self.role_ids() {
            if !catalog.contains(id) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownPersona {
                        field: format!("discussion.{}", field),
                        id: id.to_string(),
                    },
                    format!("discussion.{}: '{}' is not in the persona catalog", field, id),
                ));
            }
        }

        issues
    }

    /// Providers that a discussion may call but that have no API key.
    ///
    /// Covers the initial participants, the moderator, judge and analyst, and
    /// every supplementary persona the judge could invite.
    pub fn credential_issues(&self) -> Vec<ConfigIssue> {
        let (catalog, _) = self.build_catalog();

        let participants = {
            let resolved = catalog.resolve(&self.discussion.participants);
            if resolved.is_empty() {
                catalog.default_participants()
            } else {
                resolved
            }
        };

        let mut used: BTreeSet<ProviderKind> = BTreeSet::new();
        let involved = participants
            .iter()
            .map(String::as_str)
            .chain(self.role_ids().into_iter().map(|(_, id)| id));
        for id in involved {
            if let Some(persona) = catalog.get(id) {
                used.insert(persona.llm.provider);
            }
        }
        for persona in catalog.iter().filter(|p| p.kind == PersonaKind::Supplementary) {
            used.insert(persona.llm.provider);
        }

        used.into_iter()
            .filter(|kind| self.providers.api_key(*kind).is_none())
            .map(|kind| {
                let env = self.providers.api_key_env(kind).to_string();
                ConfigIssue::error(
                    ConfigIssueCode::MissingApiKey {
                        provider: kind.to_string(),
                        env: env.clone(),
                    },
                    format!(
                        "providers.{}: no API key (set {} or providers.{}.api_key)",
                        kind, env, kind
                    ),
                )
            })
            .collect()
    }

    fn role_ids(&self) -> [(&'static str, &str); 3] {
        [
            ("moderator", self.discussion.moderator.as_str()),
            ("judge", self.discussion.judge.as_str()),
            ("analyst", self.discussion.analyst.as_str()),
        ]
    }
}
