//! Prescription lookup: the enrichment step of an interactive turn.
//!
//! Never fails from the caller's point of view: a missing email, an empty
//! result or a store error all come back as "no record", with the reason
//! logged.

use rxpilot_core::error::EnrichmentUnavailable;
use rxpilot_core::prescription::{DocumentStore, PrescriptionRecord};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct PrescriptionLookup {
    store: Arc<dyn DocumentStore>,
}

impl PrescriptionLookup {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The most recent record for `email`, or why there isn't one.
    pub async fn try_fetch(
        &self,
        email: Option<&str>,
    ) -> Result<PrescriptionRecord, EnrichmentUnavailable> {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(EnrichmentUnavailable::Anonymous)?;

        let records = self.store.fetch_prescriptions(email).await?;

        // The store orders newest first.
        records
            .into_iter()
            .next()
            .ok_or_else(|| EnrichmentUnavailable::NoRecord(email.to_string()))
    }

    pub async fn fetch(&self, email: Option<&str>) -> Option<PrescriptionRecord> {
        match self.try_fetch(email).await {
            Ok(record) => Some(record),
            Err(EnrichmentUnavailable::Store(e)) => {
                warn!(error = %e, "Prescription lookup failed, continuing without a record");
                None
            }
            Err(reason) => {
                debug!(reason = %reason, "No prescription available");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rxpilot_core::error::StoreError;
    use rxpilot_core::prescription::PendingItem;
    use std::sync::Mutex;

    struct CountingStore {
        records: Vec<PrescriptionRecord>,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl CountingStore {
        fn with(records: Vec<PrescriptionRecord>) -> Self {
            Self {
                records,
                fail: false,
                calls: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                records: vec![],
                fail: true,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn fetch_prescriptions(
            &self,
            _email: &str,
        ) -> Result<Vec<PrescriptionRecord>, StoreError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(self.records.clone())
        }

        async fn fetch_pending(&self) -> Result<Vec<PendingItem>, StoreError> {
            Ok(vec![])
        }
    }

    fn record(text: &str) -> PrescriptionRecord {
        PrescriptionRecord {
            owner_email: "ana@example.com".into(),
            cleaned_text: text.into(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn no_email_skips_the_store() {
        let store = Arc::new(CountingStore::with(vec![record("Amoxicillin")]));
        let lookup = PrescriptionLookup::new(store.clone());

        assert!(matches!(
            lookup.try_fetch(None).await,
            Err(EnrichmentUnavailable::Anonymous)
        ));
        assert!(lookup.fetch(Some("  ")).await.is_none());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn first_record_wins() {
        let store = Arc::new(CountingStore::with(vec![record("newest"), record("older")]));
        let lookup = PrescriptionLookup::new(store.clone());

        let found = lookup.fetch(Some("ana@example.com")).await.unwrap();
        assert_eq!(found.cleaned_text, "newest");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn empty_result_is_no_record() {
        let lookup = PrescriptionLookup::new(Arc::new(CountingStore::with(vec![])));
        assert!(matches!(
            lookup.try_fetch(Some("ana@example.com")).await,
            Err(EnrichmentUnavailable::NoRecord(_))
        ));
    }

    #[tokio::test]
    async fn store_failure_is_absorbed() {
        let lookup = PrescriptionLookup::new(Arc::new(CountingStore::failing()));
        assert!(lookup.fetch(Some("ana@example.com")).await.is_none());
        assert!(matches!(
            lookup.try_fetch(Some("ana@example.com")).await,
            Err(EnrichmentUnavailable::Store(_))
        ));
    }
}
