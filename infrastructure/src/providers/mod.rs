//! LLM provider adapters
//!
//! Each adapter speaks one vendor's HTTP API and reports failures as
//! [`ProviderError`]s; [`routing::RoutingGateway`] dispatches on the
//! request's [`ProviderKind`].

pub mod anthropic;
pub mod openai;
pub mod routing;

use crate::config::FileProvidersConfig;
use anthropic::AnthropicProvider;
use async_trait::async_trait;
use openai::OpenAiProvider;
use reqwest::{Client, StatusCode};
use roundtable_application::ports::llm_gateway::{
    CallPurpose, LlmRequest, LlmResponse, ProviderError,
};
use roundtable_domain::ProviderKind;
use roundtable_domain::core::string::truncate_chars;
use routing::RoutingGateway;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound on one HTTP exchange. Per-persona timeouts are enforced by the
/// invocation gateway and are normally much shorter.
const HTTP_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// One attempt; retries belong to the caller
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;

    /// Model used by [`ProviderAdapter::health_check`]
    fn health_check_model(&self) -> &str;

    /// Send a tiny completion to prove the endpoint and the key both work.
    async fn health_check(&self) -> Result<(), ProviderError> {
        let request = health_check_request(self.kind(), self.health_check_model());
        self.complete(&request).await.map(|_| ())
    }
}

/// Request sent by provider health checks
pub fn health_check_request(provider: ProviderKind, model: &str) -> LlmRequest {
    LlmRequest {
        provider,
        model: model.to_string(),
        system_prompt: String::new(),
        prompt: "Hello".to_string(),
        temperature: 0.1,
        max_tokens: Some(10),
        persona_id: "health_check".to_string(),
        purpose: CallPurpose::HealthCheck,
    }
}

/// Register an adapter for every provider that has an API key.
///
/// Providers without a key are left out; requests routed to them fail with
/// [`ProviderError::ModelNotAvailable`].
pub fn gateway_from_config(config: &FileProvidersConfig) -> Result<RoutingGateway, ProviderError> {
    let domain = config.to_provider_config();
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for kind in ProviderKind::ALL {
        let Some(api_key) = config.api_key(kind) else {
            debug!(provider = %kind, "No API key, provider not registered");
            continue;
        };
        let adapter: Arc<dyn ProviderAdapter> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(&domain.openai, api_key)?),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(&domain.anthropic, api_key)?),
        };
        adapters.push(adapter);
    }

    Ok(RoutingGateway::new(adapters))
}

fn http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()
        .map_err(|e| ProviderError::Network(format!("failed to create HTTP client: {}", e)))
}

/// Classify a non-success HTTP status.
pub fn map_status(status: StatusCode, body: &str) -> ProviderError {
    let message = truncate_chars(body, 500);
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(message),
        408 => ProviderError::Timeout,
        429 => ProviderError::RateLimited(message),
        400 | 404 | 422 => ProviderError::InvalidRequest(message),
        code if status.is_server_error() => ProviderError::Server {
            status: code,
            message,
        },
        code => ProviderError::InvalidRequest(format!("HTTP {}: {}", code, message)),
    }
}

fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else if error.is_decode() {
        ProviderError::MalformedResponse(error.to_string())
    } else {
        ProviderError::Network(error.to_string())
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let code = |status: u16| map_status(StatusCode::from_u16(status).unwrap(), "x").code();

        assert_eq!(code(401), "authentication");
        assert_eq!(code(403), "authentication");
        assert_eq!(code(400), "invalid_request");
        assert_eq!(code(404), "invalid_request");
        assert_eq!(code(422), "invalid_request");
        assert_eq!(code(408), "timeout");
        assert_eq!(code(429), "rate_limited");
        assert_eq!(code(500), "server");
        assert_eq!(code(503), "server");
        assert_eq!(code(418), "invalid_request");
    }

    #[test]
    fn test_retryable_statuses_are_transient() {
        for status in [408, 429, 500, 502, 529] {
            assert!(
                map_status(StatusCode::from_u16(status).unwrap(), "").is_transient(),
                "{} should be retried",
                status
            );
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(!map_status(StatusCode::from_u16(status).unwrap(), "").is_transient());
        }
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "é".repeat(600);
        match map_status(StatusCode::UNAUTHORIZED, &body) {
            ProviderError::Authentication(message) => {
                assert_eq!(message.chars().count(), 503);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_gateway_registers_only_keyed_providers() {
        let mut config = FileProvidersConfig::default();
        config.openai.api_key_env = "ROUNDTABLE_TEST_UNSET_OPENAI_KEY".to_string();
        config.anthropic.api_key_env = "ROUNDTABLE_TEST_UNSET_ANTHROPIC_KEY".to_string();
        config.anthropic.api_key = Some("sk-ant-inline".to_string());

        let gateway = gateway_from_config(&config).unwrap();

        assert_eq!(gateway.kinds(), vec![ProviderKind::Anthropic]);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.openai.com/", "/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
