//! In-memory timing sink for dry runs and tests.

use async_trait::async_trait;
use rxpilot_core::error::StoreError;
use rxpilot_core::prescription::{InferenceTimingRecord, TimingSession, TimingSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Keeps records in a Vec and counts session opens and closes.
#[derive(Clone, Default)]
pub struct InMemoryTimingSink {
    records: Arc<RwLock<Vec<InferenceTimingRecord>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl InMemoryTimingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<InferenceTimingRecord> {
        self.records.read().await.clone()
    }

    /// Sessions opened but not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimingSink for InMemoryTimingSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open(&self) -> Result<Box<dyn TimingSession>, StoreError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            records: self.records.clone(),
            closed: self.closed.clone(),
        }))
    }
}

struct InMemorySession {
    records: Arc<RwLock<Vec<InferenceTimingRecord>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl TimingSession for InMemorySession {
    async fn insert(&mut self, record: &InferenceTimingRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
