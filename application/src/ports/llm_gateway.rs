//! LLM Gateway port
//!
//! Defines the uniform request/response shape every provider adapter
//! implements. Adapters live in the infrastructure layer.

use async_trait::async_trait;
use roundtable_domain::{ProviderKind, RoundPhase};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout")]
    Timeout,

    #[error("Provider server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Transient failures are worth retrying; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::RateLimited(_)
                | ProviderError::Timeout
                | ProviderError::Server { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled)
    }

    /// Stable short code for telemetry
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::Timeout => "timeout",
            ProviderError::Server { .. } => "server",
            ProviderError::Authentication(_) => "authentication",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::ModelNotAvailable(_) => "model_not_available",
            ProviderError::MalformedResponse(_) => "malformed_response",
            ProviderError::Cancelled => "cancelled",
        }
    }
}

/// What a call is for; carried through to telemetry and test doubles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "phase", rename_all = "snake_case")]
pub enum CallPurpose {
    Statement(RoundPhase),
    Judgment,
    Extraction,
    /// Minimal reachability call made by `roundtable health`
    HealthCheck,
}

impl CallPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::Statement(phase) => phase.as_str(),
            CallPurpose::Judgment => "judgment",
            CallPurpose::Extraction => "extraction",
            CallPurpose::HealthCheck => "health_check",
        }
    }
}

/// One completion request, already routed to a provider and model
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub provider: ProviderKind,
    pub model: String,
    pub system_prompt: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Persona on whose behalf the call is made
    pub persona_id: String,
    pub purpose: CallPurpose,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider reply in the uniform shape
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    /// Model id as reported by the provider
    pub model: String,
    pub usage: TokenUsage,
}

impl LlmResponse {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Gateway for LLM communication
///
/// A single attempt: no retries, no timeout. Both are applied by the
/// invocation gateway in the use case layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;
}
