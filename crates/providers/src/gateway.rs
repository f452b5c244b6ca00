//! Provider gateway: deadline-bounded model invocation with error mapping.
//!
//! Wraps one [`Provider`] and turns every way a call can go wrong (timeout,
//! rate limit, auth, transport, blocked content) into
//! [`GatewayError::ProviderUnavailable`].

use async_trait::async_trait;
use rxpilot_core::error::GatewayError;
use rxpilot_core::gateway::{Gateway, ModelResult};
use rxpilot_core::provider::{ModelRequest, Provider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct ProviderGateway {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl ProviderGateway {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// The wrapped provider, for health checks.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn unavailable(&self, reason: String) -> GatewayError {
        GatewayError::ProviderUnavailable {
            provider: self.provider.name().to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Gateway for ProviderGateway {
    async fn invoke(&self, request: ModelRequest) -> ModelResult {
        let provider_name = self.provider.name().to_string();
        let model = request.model.clone();
        let started = Instant::now();

        debug!(provider = %provider_name, model = %model, "Invoking model");

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => {
                debug!(
                    provider = %provider_name,
                    model = %response.model,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Model call succeeded"
                );
                Ok(response.text)
            }
            Ok(Err(e)) => {
                warn!(provider = %provider_name, model = %model, error = %e, "Model call failed");
                Err(self.unavailable(e.to_string()))
            }
            Err(_) => {
                warn!(
                    provider = %provider_name,
                    model = %model,
                    timeout_secs = self.timeout.as_secs(),
                    "Model call timed out"
                );
                Err(self.unavailable(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxpilot_core::error::ProviderError;
    use rxpilot_core::message::Message;
    use rxpilot_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// A mock provider that always fails.
    struct FailingProvider {
        error: ProviderError,
        call_count: Mutex<usize>,
    }

    impl FailingProvider {
        fn new(error: ProviderError) -> Self {
            Self {
                error,
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _request: ModelRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Err(self.error.clone())
        }
    }

    /// A mock provider that always succeeds.
    struct SuccessProvider;

    #[async_trait]
    impl Provider for SuccessProvider {
        fn name(&self) -> &str {
            "success"
        }

        async fn complete(
            &self,
            request: ModelRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                text: format!("echo: {}", request.messages.len()),
                model: request.model,
                usage: None,
            })
        }
    }

    /// A mock provider that hangs forever (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ModelRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn test_request() -> ModelRequest {
        ModelRequest::new("test-model", vec![Message::user("hello")])
    }

    #[tokio::test]
    async fn success_returns_text() {
        let gateway = ProviderGateway::new(Arc::new(SuccessProvider), Duration::from_secs(5));
        assert_eq!(gateway.invoke(test_request()).await.unwrap(), "echo: 1");
        assert_eq!(gateway.provider_name(), "success");
    }

    #[tokio::test]
    async fn provider_errors_become_unavailable() {
        let provider = Arc::new(FailingProvider::new(ProviderError::Network(
            "connection refused".into(),
        )));
        let gateway = ProviderGateway::new(provider.clone(), Duration::from_secs(5));

        let err = gateway.invoke(test_request()).await.unwrap_err();
        let GatewayError::ProviderUnavailable { provider: name, reason } = err;
        assert_eq!(name, "failing");
        assert!(reason.contains("connection refused"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn rate_limit_and_auth_map_the_same_way() {
        for error in [
            ProviderError::RateLimited {
                retry_after_secs: 60,
            },
            ProviderError::AuthenticationFailed("bad key".into()),
            ProviderError::Blocked("SAFETY".into()),
        ] {
            let gateway =
                ProviderGateway::new(Arc::new(FailingProvider::new(error)), Duration::from_secs(5));
            assert!(matches!(
                gateway.invoke(test_request()).await,
                Err(GatewayError::ProviderUnavailable { .. })
            ));
        }
    }

    #[tokio::test]
    async fn deadline_bounds_the_call() {
        let gateway = ProviderGateway::new(Arc::new(HangingProvider), Duration::from_millis(50));
        let err = gateway.invoke(test_request()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn api_key_never_reaches_gateway_errors() {
        let provider = crate::GeminiProvider::new("SUPER-SECRET-KEY").with_base_url("http://127.0.0.1:1");
        let gateway = ProviderGateway::new(Arc::new(provider), Duration::from_secs(5));

        let err = gateway
            .invoke(ModelRequest::new("gemini-pro", vec![Message::user("hello")]))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("gemini"));
        assert!(!text.contains("SUPER-SECRET-KEY"));
        assert!(!text.contains("generateContent"));
    }
}
