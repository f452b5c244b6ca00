//! Batch inference over every pending document.
//!
//! One bulk read of pending items, then a strictly sequential loop: time the
//! model call, persist the timing record, notify the owner. A single timing
//! session is held for the whole run and closed on every exit path.

use rxpilot_config::{AppConfig, FailurePolicy};
use rxpilot_core::error::{GatewayError, NotifyError, StoreError};
use rxpilot_core::gateway::Gateway;
use rxpilot_core::message::Message;
use rxpilot_core::notify::{Notification, Notifier};
use rxpilot_core::prescription::{
    DocumentStore, InferenceTimingRecord, PendingItem, TimingSession, TimingSink,
};
use rxpilot_core::provider::{GenerationParams, ModelRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const DEFAULT_SUBJECT: &str = "Model Inference Time";

/// Which step of an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Model,
    Persistence,
    /// The record was persisted; only the email failed.
    Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Zero-based position in the pending list.
    pub index: usize,
    pub owner_email: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "item {} ({}) failed at {:?}: {}",
            self.index + 1,
            self.owner_email,
            self.kind,
            self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Pending items read from the store.
    pub total: usize,
    /// Items that completed every step.
    pub processed: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.processed == self.total
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("could not read pending items: {0}")]
    Fetch(StoreError),

    #[error("could not open timing store: {0}")]
    SinkUnavailable(StoreError),

    #[error("a batch run is already in progress")]
    AlreadyRunning,

    #[error("batch aborted: {failure}")]
    Aborted {
        failure: ItemFailure,
        summary: BatchSummary,
    },
}

impl BatchError {
    /// Progress made before the run stopped, when any.
    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            Self::Aborted { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

pub struct BatchRunner {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn TimingSink>,
    notifier: Arc<dyn Notifier>,
    policy: FailurePolicy,
    model: String,
    params: GenerationParams,
    subject: String,
    running: Mutex<()>,
}

impl BatchRunner {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn DocumentStore>,
        sink: Arc<dyn TimingSink>,
        notifier: Arc<dyn Notifier>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            sink,
            notifier,
            policy: FailurePolicy::default(),
            model: model.into(),
            params: GenerationParams::default(),
            subject: DEFAULT_SUBJECT.into(),
            running: Mutex::new(()),
        }
    }

    /// Wire a runner with the model, generation, policy and subject from
    /// configuration.
    pub fn from_config(
        config: &AppConfig,
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn DocumentStore>,
        sink: Arc<dyn TimingSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(gateway, store, sink, notifier, config.model())
            .with_policy(config.batch.on_item_failure)
            .with_params(config.generation.params())
            .with_subject(&config.mail.subject)
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run one batch over everything currently pending.
    ///
    /// Under [`FailurePolicy::Abort`] the first failing item ends the run
    /// with [`BatchError::Aborted`]; under `Continue` failures are collected
    /// in the summary.
    pub async fn run(&self) -> Result<BatchSummary, BatchError> {
        let _guard = self.running.try_lock().map_err(|_| BatchError::AlreadyRunning)?;

        let items = self.store.fetch_pending().await.map_err(BatchError::Fetch)?;
        info!(
            items = items.len(),
            sink = %self.sink.name(),
            notifier = %self.notifier.name(),
            policy = ?self.policy,
            "Starting batch run"
        );

        let mut session = self.sink.open().await.map_err(BatchError::SinkUnavailable)?;
        let outcome = self.process_all(&items, session.as_mut()).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close timing session");
        }

        match &outcome {
            Ok(summary) => info!(
                total = summary.total,
                processed = summary.processed,
                failed = summary.failures.len(),
                "Batch run finished"
            ),
            Err(e) => error!(error = %e, "Batch run aborted"),
        }
        outcome
    }

    async fn process_all(
        &self,
        items: &[PendingItem],
        session: &mut dyn TimingSession,
    ) -> Result<BatchSummary, BatchError> {
        let mut summary = BatchSummary {
            total: items.len(),
            ..BatchSummary::default()
        };

        for (index, item) in items.iter().enumerate() {
            match self.process_one(item, session).await {
                Ok(elapsed_ms) => {
                    summary.processed += 1;
                    info!(index, owner = %item.owner_email, elapsed_ms, "Item processed");
                }
                Err((kind, reason)) => {
                    let failure = ItemFailure {
                        index,
                        owner_email: item.owner_email.clone(),
                        kind,
                        reason,
                    };
                    warn!(index, owner = %failure.owner_email, kind = ?kind, reason = %failure.reason, "Item failed");
                    match self.policy {
                        FailurePolicy::Abort => {
                            return Err(BatchError::Aborted { failure, summary });
                        }
                        FailurePolicy::Continue => summary.failures.push(failure),
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn process_one(
        &self,
        item: &PendingItem,
        session: &mut dyn TimingSession,
    ) -> Result<u64, (FailureKind, String)> {
        let request = ModelRequest::new(&self.model, vec![Message::user(&item.cleaned_text)])
            .with_params(self.params.clone());

        let started = Instant::now();
        let response = self
            .gateway
            .invoke(request)
            .await
            .map_err(|e: GatewayError| (FailureKind::Model, e.to_string()))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let record =
            InferenceTimingRecord::new(&item.owner_email, &item.cleaned_text, response, elapsed_ms);
        session
            .insert(&record)
            .await
            .map_err(|e| (FailureKind::Persistence, e.to_string()))?;

        self.notifier
            .notify(&self.notification(&item.owner_email, elapsed_ms))
            .await
            .map_err(|e: NotifyError| (FailureKind::Notification, e.to_string()))?;

        Ok(elapsed_ms)
    }

    fn notification(&self, owner_email: &str, elapsed_ms: u64) -> Notification {
        Notification {
            to: owner_email.to_string(),
            subject: self.subject.clone(),
            body: format!(
                "Hello,\n\nYour text was processed in {elapsed_ms}ms using the {} model.\n\nThanks!",
                self.model
            ),
        }
    }
}
