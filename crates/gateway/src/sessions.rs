//! In-memory registry of chat sessions keyed by id.

use chrono::{DateTime, Utc};
use rxpilot_assistant::{Assistant, ConversationSession};
use rxpilot_core::message::ConversationId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Maximum number of live sessions before the oldest is evicted.
pub const MAX_SESSIONS: usize = 1_000;

/// The caller is not the owner of the session they named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerMismatch;

/// Whether `email` may act on `session`. Ownership is all or nothing: an
/// anonymous session stays anonymous and an owned one answers only its owner.
pub fn is_owner(session: &ConversationSession, email: Option<&str>) -> bool {
    match (session.owner_email(), email) {
        (None, None) => true,
        (Some(owner), Some(email)) => owner.trim().eq_ignore_ascii_case(email.trim()),
        _ => false,
    }
}

struct Entry {
    created_at: DateTime<Utc>,
    session: Arc<ConversationSession>,
}

pub struct SessionRegistry {
    assistant: Arc<Assistant>,
    capacity: usize,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self::with_capacity(assistant, MAX_SESSIONS)
    }

    pub fn with_capacity(assistant: Arc<Assistant>, capacity: usize) -> Self {
        Self {
            assistant,
            capacity: capacity.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<ConversationSession>> {
        self.sessions.read().await.get(id).map(|e| e.session.clone())
    }

    /// Look up `id`, or start a session under it (or a fresh id).
    ///
    /// The owner email is bound when the session is created; reusing an
    /// existing id with a different email is refused.
    pub async fn get_or_create(
        &self,
        id: Option<String>,
        owner_email: Option<String>,
    ) -> Result<Arc<ConversationSession>, OwnerMismatch> {
        let id = id.unwrap_or_else(|| ConversationId::new().to_string());
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get(&id) {
            if !is_owner(&entry.session, owner_email.as_deref()) {
                warn!(session = %id, "Session reuse refused: owner mismatch");
                return Err(OwnerMismatch);
            }
            return Ok(entry.session.clone());
        }

        if sessions.len() >= self.capacity
            && let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
        {
            debug!(session = %oldest, "Evicting oldest session");
            sessions.remove(&oldest);
        }

        let session = Arc::new(ConversationSession::with_id(
            ConversationId::from(id.as_str()),
            self.assistant.clone(),
            owner_email,
        ));
        sessions.insert(
            id,
            Entry {
                created_at: Utc::now(),
                session: session.clone(),
            },
        );
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
