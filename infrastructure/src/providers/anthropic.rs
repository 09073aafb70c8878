//! Anthropic Messages API adapter

use super::{ProviderAdapter, http_client, join_url, map_status, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use roundtable_application::ports::llm_gateway::{LlmRequest, LlmResponse, ProviderError, TokenUsage};
use roundtable_domain::{AnthropicProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: String,
    default_max_tokens: u32,
    health_check_model: String,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            default_max_tokens: config.max_tokens,
            health_check_model: config.health_check_model.clone(),
        })
    }

    fn to_messages_request<'a>(&self, request: &'a LlmRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &request.model,
            // The Messages API requires max_tokens on every request
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            system: (!request.system_prompt.is_empty()).then_some(request.system_prompt.as_str()),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn health_check_model(&self) -> &str {
        &self.health_check_model
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let url = join_url(&self.base_url, "/v1/messages");
        debug!(model = %request.model, persona = %request.persona_id, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&self.to_messages_request(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body));
        }

        let body: MessagesResponse = response.json().await.map_err(map_transport_error)?;
        from_messages_response(body, &request.model)
    }
}

fn from_messages_response(
    body: MessagesResponse,
    requested_model: &str,
) -> Result<LlmResponse, ProviderError> {
    let text: String = body
        .content
        .iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "response has no text content".to_string(),
        ));
    }

    let usage = body
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse::new(text, body.model.unwrap_or_else(|| requested_model.to_string()))
        .with_usage(usage))
}

// ==================== Wire types ====================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_application::ports::llm_gateway::CallPurpose;
    use serde_json::json;

    fn request(max_tokens: Option<u32>) -> LlmRequest {
        LlmRequest {
            provider: ProviderKind::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            system_prompt: "You are a facilitator.".to_string(),
            prompt: "Summarize.".to_string(),
            temperature: 0.5,
            max_tokens,
            persona_id: "coordinator".to_string(),
            purpose: CallPurpose::Judgment,
        }
    }

    #[test]
    fn test_max_tokens_defaults_from_config() {
        let provider =
            AnthropicProvider::new(&AnthropicProviderConfig::default(), "k".to_string()).unwrap();

        let defaulted = request(None);
        let body = serde_json::to_value(provider.to_messages_request(&defaulted)).unwrap();
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["system"], "You are a facilitator.");
        assert_eq!(body["messages"], json!([{"role": "user", "content": "Summarize."}]));

        let explicit = request(Some(256));
        let body = serde_json::to_value(provider.to_messages_request(&explicit)).unwrap();
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_response_joins_text_blocks() {
        let body: MessagesResponse = serde_json::from_value(json!({
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "First. "},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Second."}
            ],
            "usage": {"input_tokens": 50, "output_tokens": 12}
        }))
        .unwrap();

        let response = from_messages_response(body, "fallback").unwrap();

        assert_eq!(response.text, "First. Second.");
        assert_eq!(response.model, "claude-sonnet-4-20250514");
        assert_eq!(response.usage.output_tokens, 12);
    }

    #[test]
    fn test_response_without_text_is_malformed() {
        let body: MessagesResponse = serde_json::from_value(json!({"content": []})).unwrap();
        assert!(matches!(
            from_messages_response(body, "m"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }
}
