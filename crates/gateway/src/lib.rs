//! HTTP API gateway for rxpilot.
//!
//! Exposes the health check, the batch trigger (`GET /process-all-texts`)
//! and the v1 chat API. Built on Axum.

pub mod api_v1;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info};

use rxpilot_assistant::Assistant;
use rxpilot_core::Gateway;
use rxpilot_workflow::{BatchError, BatchRunner, BatchScheduler, BatchSummary};

pub use sessions::SessionRegistry;

/// Shared application state.
pub struct GatewayState {
    pub sessions: SessionRegistry,
    pub batch: Arc<BatchRunner>,
    pub provider: String,
    pub model: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl GatewayState {
    pub fn new(
        assistant: Arc<Assistant>,
        batch: Arc<BatchRunner>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(assistant),
            batch,
            provider: provider.into(),
            model: model.into(),
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: health, batch trigger and `/v1`.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(
            axum::http::HeaderValue::from_static("http://localhost:8080"),
        ))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/process-all-texts", get(process_all_texts_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire every subsystem from config and serve until the listener fails.
///
/// Starts the batch scheduler when `batch.schedule` is set.
pub async fn start(config: rxpilot_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let gateway = Arc::new(rxpilot_providers::build_gateway(&config)?);
    let provider = gateway.provider_name().to_string();
    let store: Arc<dyn rxpilot_core::DocumentStore> = Arc::new(
        rxpilot_store::DocumentStoreClient::from_config(&config.document_store),
    );
    let sink = rxpilot_store::open_timing_sink(&config.persistence.database_url)?;
    let notifier = rxpilot_workflow::notifier_from_config(&config.mail);

    let assistant = Arc::new(rxpilot_assistant::build_assistant(
        &config,
        gateway.clone(),
        Some(store.clone()),
    ));
    let batch = Arc::new(BatchRunner::from_config(
        &config, gateway, store, sink, notifier,
    ));

    if let Some(scheduler) = BatchScheduler::from_config(&config.batch, batch.clone())? {
        scheduler.start();
    }

    let state = Arc::new(GatewayState::new(assistant, batch, provider, config.model()));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct BatchResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn process_all_texts_handler(
    State(state): State<SharedState>,
) -> (StatusCode, Json<BatchResponse>) {
    info!("Batch run requested over HTTP");
    // Detached so a client hanging up cannot cut the run short mid-item.
    let runner = state.batch.clone();
    let outcome = match tokio::spawn(async move { runner.run().await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Batch task panicked");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BatchResponse {
                    message: "Something went wrong",
                    summary: None,
                    error: Some(e.to_string()),
                }),
            );
        }
    };

    match outcome {
        Ok(summary) => (
            StatusCode::OK,
            Json(BatchResponse {
                message: "Processing complete.",
                summary: Some(summary),
                error: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, "Batch run over HTTP failed");
            let status = if matches!(e, BatchError::AlreadyRunning) {
                StatusCode::CONFLICT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(BatchResponse {
                    message: "Something went wrong",
                    summary: e.summary().cloned(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
