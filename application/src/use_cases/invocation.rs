//! Invocation gateway
//!
//! Wraps a raw [`LlmGateway`] with everything a single persona call needs:
//! a per-attempt timeout, bounded retries with exponential backoff for
//! transient failures, a global cap on in-flight calls, cancellation and
//! lifecycle telemetry.
//!
//! Retries are an internal detail. The caller sees either the final reply or
//! the final error; a permanent error is never retried.

use crate::config::DiscussionParams;
use crate::ports::llm_gateway::{CallPurpose, LlmGateway, LlmRequest, LlmResponse, ProviderError};
use crate::ports::telemetry::{NoTelemetry, TelemetryEvent, TelemetrySink};
use roundtable_domain::{PersonaProfile, RoundPhase, Statement};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Exponential backoff between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(8),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay after the `attempt`-th failure (1-based): `base * 2^(attempt-1)`, capped
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// System and user prompt of one call
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub system: String,
    pub prompt: String,
}

impl PromptContext {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Retrying, rate-limited front of the provider gateway.
///
/// Cloning is cheap and every clone shares the same concurrency budget,
/// so clones can be moved into spawned tasks.
pub struct InvocationGateway<G: LlmGateway + 'static> {
    gateway: Arc<G>,
    permits: Arc<Semaphore>,
    telemetry: Arc<dyn TelemetrySink>,
    backoff: BackoffPolicy,
    cancellation: Option<CancellationToken>,
}

impl<G: LlmGateway + 'static> Clone for InvocationGateway<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            permits: Arc::clone(&self.permits),
            telemetry: Arc::clone(&self.telemetry),
            backoff: self.backoff,
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<G: LlmGateway + 'static> InvocationGateway<G> {
    pub fn new(gateway: Arc<G>, max_concurrency: usize) -> Self {
        Self {
            gateway,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            telemetry: Arc::new(NoTelemetry),
            backoff: BackoffPolicy::default(),
            cancellation: None,
        }
    }

    /// Gateway sized and paced by the discussion parameters
    pub fn for_params(gateway: Arc<G>, params: &DiscussionParams) -> Self {
        Self::new(gateway, params.max_concurrency)
            .with_backoff(BackoffPolicy::new(params.backoff_base, params.backoff_max))
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Ask one persona for a statement in a fan-out phase.
    pub async fn invoke(
        &self,
        persona: &PersonaProfile,
        phase: RoundPhase,
        context: &PromptContext,
        timeout: Duration,
    ) -> Result<Statement, ProviderError> {
        let response = self
            .complete(persona, CallPurpose::Statement(phase), context, timeout)
            .await?;
        Ok(Statement::from_response(
            persona,
            phase,
            response.text,
            response.model,
        ))
    }

    /// Run one call with retries and return the provider reply as-is.
    pub async fn complete(
        &self,
        persona: &PersonaProfile,
        purpose: CallPurpose,
        context: &PromptContext,
        timeout: Duration,
    ) -> Result<LlmResponse, ProviderError> {
        let request = LlmRequest {
            provider: persona.llm.provider,
            model: persona.llm.model.clone(),
            system_prompt: context.system.clone(),
            prompt: context.prompt.clone(),
            temperature: persona.llm.temperature,
            max_tokens: persona.llm.max_tokens,
            persona_id: persona.id.clone(),
            purpose,
        };
        let max_attempts = persona.llm.attempts();
        let started = Instant::now();

        self.emit(
            TelemetryEvent::CALL_START,
            &request,
            json!({ "max_attempts": max_attempts, "timeout_ms": timeout.as_millis() as u64 }),
        );

        let mut attempt = 1;
        loop {
            let result = self.attempt(&request, timeout).await;

            match result {
                Ok(response) => {
                    debug!(
                        persona = %request.persona_id,
                        purpose = purpose.as_str(),
                        attempt,
                        "Call succeeded"
                    );
                    self.emit(
                        TelemetryEvent::CALL_SUCCESS,
                        &request,
                        json!({
                            "attempts": attempt,
                            "elapsed_ms": started.elapsed().as_millis() as u64,
                            "response_model": response.model,
                            "input_tokens": response.usage.input_tokens,
                            "output_tokens": response.usage.output_tokens,
                        }),
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        persona = %request.persona_id,
                        purpose = purpose.as_str(),
                        attempt,
                        max_attempts,
                        "Transient failure, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    self.emit(
                        TelemetryEvent::CALL_RETRY,
                        &request,
                        json!({
                            "attempt": attempt,
                            "error": e.code(),
                            "message": e.to_string(),
                            "delay_ms": delay.as_millis() as u64,
                        }),
                    );
                    if let Err(cancelled) = self.sleep_cancellable(delay).await {
                        self.emit_failure(&request, attempt, &cancelled, started);
                        return Err(cancelled);
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if !e.is_cancelled() {
                        warn!(
                            persona = %request.persona_id,
                            purpose = purpose.as_str(),
                            attempt,
                            "Call failed: {}",
                            e
                        );
                    }
                    self.emit_failure(&request, attempt, &e, started);
                    return Err(e);
                }
            }
        }
    }

    /// One attempt: wait for a permit, then call the provider under a timeout.
    ///
    /// A call already in flight is never interrupted by cancellation; it
    /// finishes or times out.
    async fn attempt(&self, request: &LlmRequest, timeout: Duration) -> Result<LlmResponse, ProviderError> {
        self.check_cancelled()?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderError::Cancelled)?;
        self.check_cancelled()?;

        match tokio::time::timeout(timeout, self.gateway.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    fn check_cancelled(&self) -> Result<(), ProviderError> {
        if self.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        Ok(())
    }

    async fn sleep_cancellable(&self, delay: Duration) -> Result<(), ProviderError> {
        match &self.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn emit_failure(&self, request: &LlmRequest, attempts: u32, error: &ProviderError, started: Instant) {
        self.emit(
            TelemetryEvent::CALL_FAILURE,
            request,
            json!({
                "attempts": attempts,
                "error": error.code(),
                "message": error.to_string(),
                "elapsed_ms": started.elapsed().as_millis() as u64,
            }),
        );
    }

    fn emit(&self, event_type: &'static str, request: &LlmRequest, extra: serde_json::Value) {
        let mut payload = json!({
            "persona": request.persona_id,
            "purpose": request.purpose,
            "provider": request.provider.as_str(),
            "model": request.model,
        });
        if let (Some(map), serde_json::Value::Object(extra)) = (payload.as_object_mut(), extra) {
            map.extend(extra);
        }
        self.telemetry.record(TelemetryEvent::new(event_type, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::testing::{RecordingTelemetry, ScriptedGateway, reply};
    use roundtable_domain::LlmSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn persona(retry_count: u32) -> PersonaProfile {
        PersonaProfile::new("tech_lead", "Kenta Yamada", "Tech Lead")
            .with_llm(LlmSettings::default().with_retry_count(retry_count))
    }

    fn context() -> PromptContext {
        PromptContext::new("system", "prompt")
    }

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(3));
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(2));
        assert_eq!(backoff.delay(4), Duration::from_secs(3));
        assert_eq!(backoff.delay(40), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let gateway = Arc::new(ScriptedGateway::new(|_, call| {
            if call <= 2 {
                Err(ProviderError::Timeout)
            } else {
                Ok(reply("ISSUES:\n1. Slow onboarding"))
            }
        }));
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 4);

        let statement = invoker
            .invoke(&persona(3), RoundPhase::Initial, &context(), TIMEOUT)
            .await
            .unwrap();

        assert!(statement.is_success());
        assert_eq!(statement.raw_issues, vec!["Slow onboarding"]);
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_last_error() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Err(ProviderError::RateLimited("slow down".into()))
        }));
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 4);

        let err = invoker
            .invoke(&persona(3), RoundPhase::Initial, &context(), TIMEOUT)
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::RateLimited("slow down".into()));
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Err(ProviderError::Authentication("bad key".into()))
        }));
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 4);

        let err = invoker
            .invoke(&persona(5), RoundPhase::Initial, &context(), TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Authentication(_)));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_enforced_per_attempt() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok(reply("late"))).with_delay(Duration::from_secs(60)),
        );
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 4);

        let err = invoker
            .invoke(&persona(2), RoundPhase::Initial, &context(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::Timeout);
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| Ok(reply("ok"))));
        let token = CancellationToken::new();
        token.cancel();
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 4).with_cancellation(token);

        let err = invoker
            .invoke(&persona(3), RoundPhase::Initial, &context(), TIMEOUT)
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::Cancelled);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let gateway = Arc::new(ScriptedGateway::new(move |_, _| {
            trigger.cancel();
            Err(ProviderError::Network("reset".into()))
        }));
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 4).with_cancellation(token);

        let err = invoker
            .invoke(&persona(5), RoundPhase::Initial, &context(), TIMEOUT)
            .await
            .unwrap_err();

        assert_eq!(err, ProviderError::Cancelled);
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_capped() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok(reply("ok")))
                .with_delay(Duration::from_secs(1))
                .with_in_flight_tracking(Arc::clone(&in_flight), Arc::clone(&peak)),
        );
        let invoker = InvocationGateway::new(Arc::clone(&gateway), 2);

        let mut join_set = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let invoker = invoker.clone();
            join_set.spawn(async move {
                invoker
                    .invoke(&persona(1), RoundPhase::Initial, &context(), TIMEOUT)
                    .await
            });
        }
        while let Some(result) = join_set.join_next().await {
            assert!(result.unwrap().is_ok());
        }

        assert_eq!(gateway.call_count(), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_lifecycle() {
        let gateway = Arc::new(ScriptedGateway::new(|_, call| {
            if call == 1 {
                Err(ProviderError::Server {
                    status: 503,
                    message: "busy".into(),
                })
            } else {
                Ok(reply("ok"))
            }
        }));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let invoker = InvocationGateway::new(gateway, 4).with_telemetry(telemetry.clone());

        invoker
            .complete(&persona(3), CallPurpose::Judgment, &context(), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(
            telemetry.event_types(),
            vec!["call_start", "call_retry", "call_success"]
        );
        let events = telemetry.events();
        assert_eq!(events[0].1["persona"], "tech_lead");
        assert_eq!(events[1].1["error"], "server");
        assert_eq!(events[2].1["attempts"], 2);
    }
}
