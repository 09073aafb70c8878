use super::ProviderAdapter;
use async_trait::async_trait;
use roundtable_application::ports::llm_gateway::{LlmGateway, LlmRequest, LlmResponse, ProviderError};
use roundtable_domain::ProviderKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// [`LlmGateway`] that hands each request to the adapter registered for its
/// provider kind.
pub struct RoutingGateway {
    providers: Vec<Arc<dyn ProviderAdapter>>,
}

impl RoutingGateway {
    /// Later adapters of the same kind replace earlier ones.
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let mut deduped: Vec<Arc<dyn ProviderAdapter>> = Vec::with_capacity(providers.len());
        for provider in providers {
            deduped.retain(|p| p.kind() != provider.kind());
            deduped.push(provider);
        }
        Self { providers: deduped }
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Health-check every registered provider in turn, each bounded by
    /// `timeout`.
    pub async fn health_check(
        &self,
        timeout: Duration,
    ) -> Vec<(ProviderKind, Result<(), ProviderError>)> {
        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let outcome = match tokio::time::timeout(timeout, provider.health_check()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout),
            };
            if let Err(e) = &outcome {
                warn!(provider = %provider.kind(), "Provider health check failed: {}", e);
            }
            results.push((provider.kind(), outcome));
        }
        results
    }

    fn resolve_provider(&self, kind: ProviderKind) -> Result<&dyn ProviderAdapter, ProviderError> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
            .ok_or_else(|| ProviderError::ModelNotAvailable(format!("provider '{}' is not configured", kind)))
    }
}

#[async_trait]
impl LlmGateway for RoutingGateway {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        self.resolve_provider(request.provider)?.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_application::ports::llm_gateway::CallPurpose;
    use std::sync::Mutex;

    // -- Mock ProviderAdapter --------------------------------------------------

    struct MockProvider {
        kind: ProviderKind,
        label: &'static str,
    }

    impl MockProvider {
        fn new(kind: ProviderKind, label: &'static str) -> Arc<dyn ProviderAdapter> {
            Arc::new(Self { kind, label })
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
            Ok(LlmResponse::new(self.label, request.model.clone()))
        }

        fn health_check_model(&self) -> &str {
            "tiny-model"
        }
    }

    /// Adapter with a fixed outcome that records what it was sent
    struct ScriptedProvider {
        kind: ProviderKind,
        outcome: Result<(), ProviderError>,
        delay: Duration,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedProvider {
        fn new(kind: ProviderKind, outcome: Result<(), ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn slow(kind: ProviderKind, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome: Ok(()),
                delay,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            tokio::time::sleep(self.delay).await;
            self.outcome
                .clone()
                .map(|_| LlmResponse::new("Hi", request.model.clone()))
        }

        fn health_check_model(&self) -> &str {
            "tiny-model"
        }
    }

    fn request(provider: ProviderKind) -> LlmRequest {
        LlmRequest {
            provider,
            model: "some-model".to_string(),
            system_prompt: String::new(),
            prompt: "hi".to_string(),
            temperature: 0.7,
            max_tokens: None,
            persona_id: "tech_lead".to_string(),
            purpose: CallPurpose::Extraction,
        }
    }

    #[tokio::test]
    async fn dispatches_on_request_provider() {
        let gateway = RoutingGateway::new(vec![
            MockProvider::new(ProviderKind::OpenAi, "openai"),
            MockProvider::new(ProviderKind::Anthropic, "anthropic"),
        ]);

        let reply = gateway.complete(&request(ProviderKind::Anthropic)).await.unwrap();
        assert_eq!(reply.text, "anthropic");

        let reply = gateway.complete(&request(ProviderKind::OpenAi)).await.unwrap();
        assert_eq!(reply.text, "openai");
    }

    #[tokio::test]
    async fn unregistered_provider_is_permanent_failure() {
        let gateway = RoutingGateway::new(vec![MockProvider::new(ProviderKind::OpenAi, "openai")]);

        let err = gateway.complete(&request(ProviderKind::Anthropic)).await.unwrap_err();

        assert!(matches!(err, ProviderError::ModelNotAvailable(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn later_registration_replaces_same_kind() {
        let gateway = RoutingGateway::new(vec![
            MockProvider::new(ProviderKind::OpenAi, "first"),
            MockProvider::new(ProviderKind::Anthropic, "anthropic"),
            MockProvider::new(ProviderKind::OpenAi, "second"),
        ]);

        assert_eq!(gateway.kinds(), vec![ProviderKind::Anthropic, ProviderKind::OpenAi]);
    }

    #[tokio::test]
    async fn health_check_reports_each_registered_provider() {
        let openai = ScriptedProvider::new(ProviderKind::OpenAi, Ok(()));
        let anthropic = ScriptedProvider::new(
            ProviderKind::Anthropic,
            Err(ProviderError::Authentication("bad key".into())),
        );
        let gateway = RoutingGateway::new(vec![
            openai.clone() as Arc<dyn ProviderAdapter>,
            anthropic.clone() as Arc<dyn ProviderAdapter>,
        ]);

        let results = gateway.health_check(Duration::from_secs(5)).await;

        assert_eq!(
            results,
            vec![
                (ProviderKind::OpenAi, Ok(())),
                (
                    ProviderKind::Anthropic,
                    Err(ProviderError::Authentication("bad key".into()))
                ),
            ]
        );
        let sent = openai.requests.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].provider, ProviderKind::OpenAi);
        assert_eq!(sent[0].model, "tiny-model");
        assert_eq!(sent[0].purpose, CallPurpose::HealthCheck);
        assert_eq!(sent[0].max_tokens, Some(10));
        assert_eq!(anthropic.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_check_times_out_slow_provider() {
        let gateway = RoutingGateway::new(vec![
            ScriptedProvider::slow(ProviderKind::OpenAi, Duration::from_secs(5)) as Arc<dyn ProviderAdapter>,
        ]);

        let results = gateway.health_check(Duration::from_millis(20)).await;

        assert_eq!(results, vec![(ProviderKind::OpenAi, Err(ProviderError::Timeout))]);
    }

    #[tokio::test]
    async fn health_check_without_providers_is_empty() {
        let gateway = RoutingGateway::new(Vec::new());
        assert!(gateway.health_check(Duration::from_secs(1)).await.is_empty());
    }
}
