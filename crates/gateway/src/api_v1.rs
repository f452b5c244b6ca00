//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`                   : send a message, get the formatted reply
//! - `GET  /v1/sessions/{id}/messages` : session history, oldest first (owner only)
//! - `GET  /v1/status`                 : provider, model, live sessions, uptime

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rxpilot_assistant::SessionError;
use rxpilot_core::message::Message;

use crate::SharedState;
use crate::sessions::is_owner;

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/sessions/{id}/messages", get(session_messages_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing session ID (omit to start one).
    #[serde(default)]
    session_id: Option<String>,
    /// Owner of the prescriptions to consult; omit for anonymous use.
    #[serde(default)]
    user_email: Option<String>,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    session_id: String,
    /// `None` when the reply is the fixed apology.
    intent: Option<String>,
    reply: String,
}

#[derive(Serialize, Deserialize)]
struct MessageDto {
    id: String,
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    intent: Option<String>,
    timestamp: String,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.clone(),
            role: format!("{:?}", m.role).to_lowercase(),
            content: m.content.clone(),
            intent: m.intent.map(|i| i.to_string()),
            timestamp: m.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    user_email: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct SessionMessagesResponse {
    session_id: String,
    messages: Vec<MessageDto>,
}

#[derive(Serialize, Deserialize)]
struct StatusResponse {
    provider: String,
    model: String,
    sessions: usize,
    batch_policy: String,
    uptime_secs: i64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.message.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, SessionError::EmptyUtterance.to_string()));
    }

    let user_email = payload.user_email.filter(|e| !e.trim().is_empty());
    let session = state
        .sessions
        .get_or_create(payload.session_id, user_email)
        .await
        .map_err(|_| error(StatusCode::FORBIDDEN, "session belongs to another user"))?;
    info!(session = %session.id(), message_len = payload.message.len(), "v1/chat request");

    match session.submit(&payload.message).await {
        Ok(reply) => Ok(Json(ChatResponse {
            session_id: session.id().to_string(),
            intent: reply.intent.map(|i| i.to_string()),
            reply: reply.content,
        })),
        Err(SessionError::TurnInFlight) => {
            warn!(session = %session.id(), "Rejected chat request: turn in flight");
            Err(error(StatusCode::CONFLICT, SessionError::TurnInFlight.to_string()))
        }
        Err(e) => Err(error(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn session_messages_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<SessionMessagesResponse>, StatusCode> {
    let session = state.sessions.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let user_email = query.user_email.filter(|e| !e.trim().is_empty());
    if !is_owner(&session, user_email.as_deref()) {
        warn!(session = %id, "History request refused: owner mismatch");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(Json(SessionMessagesResponse {
        session_id: id,
        messages: session.history().iter().map(MessageDto::from).collect(),
    }))
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        provider: state.provider.clone(),
        model: state.model.clone(),
        sessions: state.sessions.len().await,
        batch_policy: format!("{:?}", state.batch.policy()).to_lowercase(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
    })
}
