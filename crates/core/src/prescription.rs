//! Prescription records, batch work items and timing persistence traits.
//!
//! The document store owns prescriptions; this crate only reads them.
//! Timing records are written once per processed batch item and never updated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A user's stored, OCR-cleaned prescription text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub owner_email: String,
    pub cleaned_text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One (owner, text) pair waiting for batch inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    pub owner_email: String,
    pub cleaned_text: String,
}

/// Latency and output of one batch model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceTimingRecord {
    pub owner_email: String,
    pub input_text: String,
    pub model_response: String,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl InferenceTimingRecord {
    /// Stamp a record with the current time.
    pub fn new(
        owner_email: impl Into<String>,
        input_text: impl Into<String>,
        model_response: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            owner_email: owner_email.into(),
            input_text: input_text.into(),
            model_response: model_response.into(),
            elapsed_ms,
            created_at: Utc::now(),
        }
    }
}

/// Read access to the external document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All prescriptions for `email`, newest first. An unknown user is an
    /// empty list, not an error.
    async fn fetch_prescriptions(&self, email: &str) -> Result<Vec<PrescriptionRecord>, StoreError>;

    /// Every pending (owner, text) pair, in store order.
    async fn fetch_pending(&self) -> Result<Vec<PendingItem>, StoreError>;
}

/// Source of per-run persistence sessions.
///
/// A batch run opens exactly one session and closes it when done,
/// whether or not the run succeeded.
#[async_trait]
pub trait TimingSink: Send + Sync {
    /// Short backend name for logs ("sqlite", "postgres", "memory").
    fn name(&self) -> &str;

    async fn open(&self) -> Result<Box<dyn TimingSession>, StoreError>;
}

/// A live persistence connection scoped to one batch run.
#[async_trait]
pub trait TimingSession: Send {
    /// Persist one record. Called exactly once per successful item.
    async fn insert(&mut self, record: &InferenceTimingRecord) -> Result<(), StoreError>;

    /// Release the underlying connection.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
