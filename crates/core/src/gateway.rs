//! Gateway trait: the single narrow seam for model invocation.
//!
//! Callers hand over a [`ModelRequest`] and get either text or a typed
//! failure. Transport problems never escape as anything but
//! [`GatewayError::ProviderUnavailable`].

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::provider::ModelRequest;

/// Outcome of one model invocation.
pub type ModelResult = std::result::Result<String, GatewayError>;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run one generation. Never panics, never returns transport errors.
    async fn invoke(&self, request: ModelRequest) -> ModelResult;

    /// Name of the backend behind this gateway, for logs and notifications.
    fn provider_name(&self) -> &str;
}
