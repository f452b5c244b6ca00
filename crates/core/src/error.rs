//! Error types for the rxpilot domain.
//!
//! Each bounded context has its own error type. Crates that orchestrate
//! several contexts (assistant, workflow) define their own wrappers.

use thiserror::Error;

// --- Bounded context errors ---

/// Detailed failure from a concrete model backend.
///
/// These never leave the gateway: [`GatewayError`] is what callers see.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Response blocked by provider: {0}")]
    Blocked(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// The only failure kind a model invocation can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Model provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Document store unreachable: {0}")]
    Unavailable(String),

    #[error("Document store returned status {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("Invalid payload from document store: {0}")]
    InvalidPayload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Why a turn could not be enriched with a stored prescription.
///
/// Always recovered locally by falling back to the general prompt.
#[derive(Debug, Clone, Error)]
pub enum EnrichmentUnavailable {
    #[error("no owner email on the session")]
    Anonymous,

    #[error("no prescription on file for {0}")]
    NoRecord(String),

    #[error("prescription lookup failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Delivery to {recipient} failed: {reason}")]
    DeliveryFailed { recipient: String, reason: String },
}
