//! OpenAI chat completions adapter
//!
//! Also works against any OpenAI-compatible endpoint by pointing
//! `base_url` elsewhere.

use super::{ProviderAdapter, http_client, join_url, map_status, map_transport_error};
use async_trait::async_trait;
use reqwest::Client;
use roundtable_application::ports::llm_gateway::{LlmRequest, LlmResponse, ProviderError, TokenUsage};
use roundtable_domain::{OpenAiProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_max_tokens: Option<u32>,
    health_check_model: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url: config.base_url.clone(),
            default_max_tokens: config.max_tokens,
            health_check_model: config.health_check_model.clone(),
        })
    }

    fn to_openai_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens.or(self.default_max_tokens),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn health_check_model(&self) -> &str {
        &self.health_check_model
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let url = join_url(&self.base_url, "/v1/chat/completions");
        debug!(model = %request.model, persona = %request.persona_id, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_openai_request(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body));
        }

        let body: ChatResponse = response.json().await.map_err(map_transport_error)?;
        from_openai_response(body, &request.model)
    }
}

fn from_openai_response(body: ChatResponse, requested_model: &str) -> Result<LlmResponse, ProviderError> {
    let text = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::MalformedResponse("response has no message content".to_string()))?;

    let usage = body
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse::new(text, body.model.unwrap_or_else(|| requested_model.to_string())).with_usage(usage))
}

// ==================== Wire types ====================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_application::ports::llm_gateway::CallPurpose;
    use roundtable_domain::RoundPhase;
    use serde_json::json;

    fn request() -> LlmRequest {
        LlmRequest {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o".to_string(),
            system_prompt: "You are a tech lead.".to_string(),
            prompt: "Discuss hiring.".to_string(),
            temperature: 0.7,
            max_tokens: None,
            persona_id: "tech_lead".to_string(),
            purpose: CallPurpose::Statement(RoundPhase::Initial),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let config = OpenAiProviderConfig {
            max_tokens: Some(1024),
            ..Default::default()
        };
        let provider = OpenAiProvider::new(&config, "sk-test".to_string()).unwrap();
        let request = request();

        let body = serde_json::to_value(provider.to_openai_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "You are a tech lead."},
                    {"role": "user", "content": "Discuss hiring."}
                ],
                "temperature": 0.7f32,
                "max_tokens": 1024
            })
        );
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let provider = OpenAiProvider::new(&OpenAiProviderConfig::default(), "k".to_string()).unwrap();
        let mut request = request();
        request.system_prompt.clear();

        let body = serde_json::to_value(provider.to_openai_request(&request)).unwrap();

        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let body: ChatResponse = serde_json::from_value(json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "We should..."}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160}
        }))
        .unwrap();

        let response = from_openai_response(body, "gpt-4o").unwrap();

        assert_eq!(response.text, "We should...");
        assert_eq!(response.model, "gpt-4o-2024-08-06");
        assert_eq!(response.usage.input_tokens, 120);
        assert_eq!(response.usage.output_tokens, 40);
    }

    #[test]
    fn test_response_without_choices_is_malformed() {
        let body: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();

        let err = from_openai_response(body, "gpt-4o").unwrap_err();

        assert!(matches!(err, ProviderError::MalformedResponse(_)));
        assert!(!err.is_transient());
    }
}
