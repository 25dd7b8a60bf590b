//! Fallback Router (spec §4.5): single attempt per candidate, walking an
//! ordered list until one succeeds or all fail. Grounded on the grounding
//! codebase's `ReliableProvider`, but diverging from its per-provider
//! retry-with-backoff: the specification calls for exactly one attempt per
//! candidate, with retry expressed only as "try the next candidate".

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ProviderError, ProviderErrorKind};
use crate::model::Message;

use super::traits::{ChatOptions, ChatResponse, LlmProvider};

#[derive(Debug, Clone)]
pub struct Attempt {
    pub provider_id: String,
    pub success: bool,
    pub error_kind: Option<ProviderErrorKind>,
    pub latency_ms: u64,
}

#[derive(Debug)]
pub struct FallbackOutcome {
    pub response: ChatResponse,
    pub provider_id: String,
    pub model: String,
    pub attempts: Vec<Attempt>,
    pub total_elapsed_ms: u64,
}

pub struct FallbackRouter {
    per_call_timeout: Duration,
}

impl Default for FallbackRouter {
    fn default() -> Self {
        Self { per_call_timeout: Duration::from_secs(90) }
    }
}

impl FallbackRouter {
    pub fn new(per_call_timeout: Duration) -> Self {
        Self { per_call_timeout }
    }

    /// Try each `(provider, model)` candidate in order. Stops at the first
    /// success; a non-retryable error also stops the chain immediately
    /// (spec §4.5).
    pub async fn chat(
        &self,
        candidates: &[(Arc<dyn LlmProvider>, String)],
        context: &[Message],
        tools_and_limits: impl Fn(&str) -> ChatOptions,
    ) -> Result<FallbackOutcome, ProviderError> {
        let start = Instant::now();
        let mut attempts = Vec::new();
        let mut last_error: Option<ProviderError> = None;

        for (provider, model) in candidates {
            let options = tools_and_limits(model);
            let attempt_start = Instant::now();
            let result = tokio::time::timeout(self.per_call_timeout, provider.chat(context, &options)).await;
            let latency_ms = attempt_start.elapsed().as_millis() as u64;

            match result {
                Ok(Ok(response)) => {
                    attempts.push(Attempt { provider_id: provider.id().to_string(), success: true, error_kind: None, latency_ms });
                    return Ok(FallbackOutcome {
                        response,
                        provider_id: provider.id().to_string(),
                        model: model.clone(),
                        attempts,
                        total_elapsed_ms: start.elapsed().as_millis() as u64,
                    });
                }
                Ok(Err(err)) => {
                    let retryable = err.kind.is_retryable();
                    attempts.push(Attempt { provider_id: provider.id().to_string(), success: false, error_kind: Some(err.kind), latency_ms });
                    let stop = !retryable;
                    last_error = Some(err);
                    if stop {
                        break;
                    }
                }
                Err(_elapsed) => {
                    attempts.push(Attempt {
                        provider_id: provider.id().to_string(),
                        success: false,
                        error_kind: Some(ProviderErrorKind::Timeout),
                        latency_ms,
                    });
                    last_error = Some(ProviderError::new(ProviderErrorKind::Timeout, "provider call exceeded per-call timeout"));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::new(ProviderErrorKind::Internal, "no candidates to try")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use super::super::traits::TokenUsage;

    struct FixedProvider {
        id: String,
        models: Vec<String>,
        kind: Option<ProviderErrorKind>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn id(&self) -> &str {
            &self.id
        }
        fn models(&self) -> &[String] {
            &self.models
        }
        async fn chat(&self, _context: &[Message], _options: &ChatOptions) -> Result<ChatResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.kind {
                None => Ok(ChatResponse { content: format!("reply from {}", self.id), tool_calls: vec![], usage: TokenUsage::default() }),
                Some(kind) => Err(ProviderError::new(kind, "boom")),
            }
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_candidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "a".into(), models: vec!["m1".into()], kind: None, calls: calls.clone() });
        let router = FallbackRouter::default();
        let outcome = router
            .chat(&[(provider, "m1".into())], &[], |m| ChatOptions::new(m))
            .await
            .unwrap();
        assert_eq!(outcome.provider_id, "a");
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_through_retryable_failure_to_next_candidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let failing: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "a".into(), models: vec!["m1".into()], kind: Some(ProviderErrorKind::RateLimit), calls: calls.clone() });
        let ok: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "b".into(), models: vec!["m1".into()], kind: None, calls: calls.clone() });
        let router = FallbackRouter::default();
        let outcome = router
            .chat(&[(failing, "m1".into()), (ok, "m1".into())], &[], |m| ChatOptions::new(m))
            .await
            .unwrap();
        assert_eq!(outcome.provider_id, "b");
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].success);
        assert!(outcome.attempts[1].success);
    }

    #[tokio::test]
    async fn non_retryable_failure_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let auth_fail: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "a".into(), models: vec!["m1".into()], kind: Some(ProviderErrorKind::Auth), calls: calls.clone() });
        let ok: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "b".into(), models: vec!["m1".into()], kind: None, calls: calls.clone() });
        let router = FallbackRouter::default();
        let err = router
            .chat(&[(auth_fail, "m1".into()), (ok, "m1".into())], &[], |m| ChatOptions::new(m))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Auth);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_candidates_failing_returns_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let a: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "a".into(), models: vec!["m1".into()], kind: Some(ProviderErrorKind::Timeout), calls: calls.clone() });
        let b: Arc<dyn LlmProvider> = Arc::new(FixedProvider { id: "b".into(), models: vec!["m1".into()], kind: Some(ProviderErrorKind::Provider5xx), calls: calls.clone() });
        let router = FallbackRouter::default();
        let err = router
            .chat(&[(a, "m1".into()), (b, "m1".into())], &[], |m| ChatOptions::new(m))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Provider5xx);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
