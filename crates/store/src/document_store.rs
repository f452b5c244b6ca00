//! HTTP client for the external document store service.
//!
//! Two endpoints are used:
//! - `GET /user-prescriptions?user_email=<email>` → `{count, prescriptions: [...]}`,
//!   newest first, 404 when the user has none
//! - `GET /all-cleaned-texts` → `{data: [{user_email, cleaned_text}]}`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rxpilot_core::error::StoreError;
use rxpilot_core::prescription::{DocumentStore, PendingItem, PrescriptionRecord};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Timestamp layout the store uses (`YYYY-MM-DD HH:MM:SS`, UTC).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct DocumentStoreClient {
    base_url: String,
    client: reqwest::Client,
}

impl DocumentStoreClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &rxpilot_config::DocumentStoreConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the service answers at all. Any HTTP status counts.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let response = self.get("/", &[]).await?;
        debug!(status = response.status().as_u16(), "Document store reachable");
        Ok(())
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn error_status(response: reqwest::Response) -> StoreError {
        let status_code = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        warn!(status = status_code, body = %message, "Document store returned error");
        StoreError::Status {
            status_code,
            message,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

#[async_trait]
impl DocumentStore for DocumentStoreClient {
    async fn fetch_prescriptions(&self, email: &str) -> Result<Vec<PrescriptionRecord>, StoreError> {
        debug!(email = %email, "Fetching prescriptions");

        let response = self.get("/user-prescriptions", &[("user_email", email)]).await?;

        if response.status().as_u16() == 404 {
            debug!(email = %email, "No prescriptions on file");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(Self::error_status(response).await);
        }

        let body: PrescriptionsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(format!("prescriptions body: {e}")))?;

        let records = body
            .prescriptions
            .into_iter()
            .filter_map(|p| {
                let cleaned_text = p.cleaned_text.filter(|t| !t.trim().is_empty())?;
                Some(PrescriptionRecord {
                    owner_email: p.user_email.unwrap_or_else(|| email.to_string()),
                    cleaned_text,
                    created_at: p.timestamp.as_deref().and_then(parse_timestamp),
                })
            })
            .collect();

        Ok(records)
    }

    async fn fetch_pending(&self) -> Result<Vec<PendingItem>, StoreError> {
        let response = self.get("/all-cleaned-texts", &[]).await?;

        if !response.status().is_success() {
            return Err(Self::error_status(response).await);
        }

        let body: PendingResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidPayload(format!("pending body: {e}")))?;

        let Some(entries) = body.data else {
            return Err(StoreError::InvalidPayload(
                "expected a `data` array of pending texts".into(),
            ));
        };

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match (entry.user_email.filter(|s| !s.is_empty()), entry.cleaned_text) {
                (Some(owner_email), Some(cleaned_text)) => items.push(PendingItem {
                    owner_email,
                    cleaned_text,
                }),
                _ => warn!(index, "Skipping pending entry without owner email or text"),
            }
        }

        debug!(count = items.len(), "Fetched pending texts");
        Ok(items)
    }
}

// --- Document store API types (internal) ---

#[derive(Debug, Deserialize)]
struct PendingResponse {
    #[serde(default)]
    data: Option<Vec<ApiPending>>,
}

#[derive(Debug, Deserialize)]
struct ApiPending {
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    cleaned_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrescriptionsResponse {
    #[serde(default)]
    prescriptions: Vec<ApiPrescription>,
}

#[derive(Debug, Deserialize)]
struct ApiPrescription {
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    cleaned_text: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}
