//! Shared test doubles for assistant tests.

use async_trait::async_trait;
use rxpilot_core::error::{GatewayError, StoreError};
use rxpilot_core::gateway::{Gateway, ModelResult};
use rxpilot_core::prescription::{DocumentStore, PendingItem, PrescriptionRecord};
use rxpilot_core::provider::ModelRequest;
use std::sync::Mutex;
use std::time::Duration;

/// A gateway that answers every call with a fixed text and records requests.
pub struct ScriptedGateway {
    reply: String,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedGateway {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn invoke(&self, request: ModelRequest) -> ModelResult {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// A gateway whose provider is always down.
pub struct FailingGateway;

#[async_trait]
impl Gateway for FailingGateway {
    async fn invoke(&self, _request: ModelRequest) -> ModelResult {
        Err(GatewayError::ProviderUnavailable {
            provider: "failing".into(),
            reason: "connection refused".into(),
        })
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// A gateway that takes `delay` before answering.
pub struct SlowGateway {
    pub delay: Duration,
}

#[async_trait]
impl Gateway for SlowGateway {
    async fn invoke(&self, _request: ModelRequest) -> ModelResult {
        tokio::time::sleep(self.delay).await;
        Ok("done".into())
    }

    fn provider_name(&self) -> &str {
        "slow"
    }
}

/// A document store that serves fixed records and counts reads.
pub struct CountingStore {
    records: Vec<PrescriptionRecord>,
    calls: Mutex<usize>,
}

impl CountingStore {
    pub fn with_text(text: &str) -> Self {
        Self {
            records: vec![PrescriptionRecord {
                owner_email: "ana@example.com".into(),
                cleaned_text: text.into(),
                created_at: None,
            }],
            calls: Mutex::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            records: vec![],
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn fetch_prescriptions(&self, _email: &str) -> Result<Vec<PrescriptionRecord>, StoreError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.records.clone())
    }

    async fn fetch_pending(&self) -> Result<Vec<PendingItem>, StoreError> {
        Ok(vec![])
    }
}
