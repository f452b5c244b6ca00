//! Test doubles for batch tests.

use async_trait::async_trait;
use rxpilot_core::error::{GatewayError, NotifyError, StoreError};
use rxpilot_core::gateway::{Gateway, ModelResult};
use rxpilot_core::notify::{Notification, Notifier};
use rxpilot_core::prescription::{
    DocumentStore, InferenceTimingRecord, PendingItem, PrescriptionRecord, TimingSession, TimingSink,
};
use rxpilot_core::provider::ModelRequest;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fails on the listed call numbers (1-based), answers `reply N` otherwise.
pub struct FlakyGateway {
    fail_on: Vec<usize>,
    delay: Duration,
    calls: Mutex<usize>,
}

impl FlakyGateway {
    pub fn never_failing() -> Self {
        Self::failing_on(&[])
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            delay: Duration::ZERO,
            calls: Mutex::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Gateway for FlakyGateway {
    async fn invoke(&self, _request: ModelRequest) -> ModelResult {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_on.contains(&call) {
            return Err(GatewayError::ProviderUnavailable {
                provider: "flaky".into(),
                reason: format!("call {call} refused"),
            });
        }
        Ok(format!("reply {call}"))
    }

    fn provider_name(&self) -> &str {
        "flaky"
    }
}

/// Serves a fixed pending queue.
pub struct QueueStore {
    pending: Result<Vec<PendingItem>, StoreError>,
}

impl QueueStore {
    pub fn with_owners(owners: &[&str]) -> Self {
        Self {
            pending: Ok(owners
                .iter()
                .map(|owner| PendingItem {
                    owner_email: owner.to_string(),
                    cleaned_text: format!("text for {owner}"),
                })
                .collect()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            pending: Err(StoreError::Unavailable("connection refused".into())),
        }
    }
}

#[async_trait]
impl DocumentStore for QueueStore {
    async fn fetch_prescriptions(&self, _email: &str) -> Result<Vec<PrescriptionRecord>, StoreError> {
        Ok(vec![])
    }

    async fn fetch_pending(&self) -> Result<Vec<PendingItem>, StoreError> {
        self.pending.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::DeliveryFailed {
                recipient: notification.to.clone(),
                reason: "mailbox unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// A sink whose sessions reject every write.
pub fn failing_sink() -> Arc<dyn TimingSink> {
    Arc::new(RejectingSink)
}

struct RejectingSink;

#[async_trait]
impl TimingSink for RejectingSink {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn open(&self) -> Result<Box<dyn TimingSession>, StoreError> {
        Ok(Box::new(RejectingSession))
    }
}

struct RejectingSession;

#[async_trait]
impl TimingSession for RejectingSession {
    async fn insert(&mut self, _record: &InferenceTimingRecord) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed("disk full".into()))
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
