//! Provider configuration from TOML (`[providers]` section)

use roundtable_domain::{AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};

/// Anthropic API provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnthropicConfig {
    /// Environment variable name for the API key (default: "ANTHROPIC_API_KEY").
    pub api_key_env: String,
    /// Direct API key, used only when the environment variable is unset.
    pub api_key: Option<String>,
    /// Base URL for the Anthropic API.
    pub base_url: String,
    /// Default max tokens per response.
    pub max_tokens: u32,
    /// Anthropic API version header.
    pub api_version: String,
    /// Model called by `roundtable health`.
    pub health_check_model: String,
}

impl Default for FileAnthropicConfig {
    fn default() -> Self {
        let defaults = AnthropicProviderConfig::default();
        Self {
            api_key_env: defaults.api_key_env,
            api_key: defaults.api_key,
            base_url: defaults.base_url,
            max_tokens: defaults.max_tokens,
            api_version: defaults.api_version,
            health_check_model: defaults.health_check_model,
        }
    }
}

/// OpenAI API provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOpenAiConfig {
    /// Environment variable name for the API key (default: "OPENAI_API_KEY").
    pub api_key_env: String,
    /// Direct API key, used only when the environment variable is unset.
    pub api_key: Option<String>,
    /// Base URL for the OpenAI API (can point at a compatible gateway).
    pub base_url: String,
    /// Default max tokens per response.
    pub max_tokens: Option<u32>,
    /// Model called by `roundtable health`.
    pub health_check_model: String,
}

impl Default for FileOpenAiConfig {
    fn default() -> Self {
        let defaults = OpenAiProviderConfig::default();
        Self {
            api_key_env: defaults.api_key_env,
            api_key: defaults.api_key,
            base_url: defaults.base_url,
            max_tokens: defaults.max_tokens,
            health_check_model: defaults.health_check_model,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    /// Anthropic API settings.
    pub anthropic: FileAnthropicConfig,
    /// OpenAI API settings.
    pub openai: FileOpenAiConfig,
}

impl FileProvidersConfig {
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            anthropic: AnthropicProviderConfig {
                api_key_env: self.anthropic.api_key_env.clone(),
                api_key: self.anthropic.api_key.clone(),
                base_url: self.anthropic.base_url.clone(),
                max_tokens: self.anthropic.max_tokens,
                api_version: self.anthropic.api_version.clone(),
                health_check_model: self.anthropic.health_check_model.clone(),
            },
            openai: OpenAiProviderConfig {
                api_key_env: self.openai.api_key_env.clone(),
                api_key: self.openai.api_key.clone(),
                base_url: self.openai.base_url.clone(),
                max_tokens: self.openai.max_tokens,
                health_check_model: self.openai.health_check_model.clone(),
            },
        }
    }

    /// Name of the environment variable holding the key for `kind`
    pub fn api_key_env(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => &self.openai.api_key_env,
            ProviderKind::Anthropic => &self.anthropic.api_key_env,
        }
    }

    /// Resolve the API key for `kind`: the configured environment variable
    /// first, then the inline key. Blank values count as missing.
    pub fn api_key(&self, kind: ProviderKind) -> Option<String> {
        let inline = match kind {
            ProviderKind::OpenAi => self.openai.api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic.api_key.as_deref(),
        };
        resolve_api_key(std::env::var(self.api_key_env(kind)).ok().as_deref(), inline)
    }
}

fn resolve_api_key(from_env: Option<&str>, inline: Option<&str>) -> Option<String> {
    from_env
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| inline.map(str::trim).filter(|k| !k.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_wins_over_inline() {
        assert_eq!(
            resolve_api_key(Some("sk-env"), Some("sk-inline")).as_deref(),
            Some("sk-env")
        );
        assert_eq!(
            resolve_api_key(None, Some("sk-inline")).as_deref(),
            Some("sk-inline")
        );
        assert_eq!(
            resolve_api_key(Some("  "), Some("sk-inline")).as_deref(),
            Some("sk-inline")
        );
        assert_eq!(resolve_api_key(Some(""), Some("")), None);
    }

    #[test]
    fn test_provider_section_from_toml() {
        let config: FileProvidersConfig = toml::from_str(
            r#"
            [anthropic]
            api_key_env = "MY_CLAUDE_KEY"
            max_tokens = 2048

            [openai]
            base_url = "http://localhost:8080"
            "#,
        )
        .unwrap();

        let domain = config.to_provider_config();
        assert_eq!(domain.anthropic.api_key_env, "MY_CLAUDE_KEY");
        assert_eq!(domain.anthropic.max_tokens, 2048);
        assert_eq!(domain.anthropic.api_version, "2023-06-01");
        assert_eq!(domain.openai.base_url, "http://localhost:8080");
        assert_eq!(domain.openai.api_key_env, "OPENAI_API_KEY");
    }
}
