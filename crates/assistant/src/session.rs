//! Conversational session: ordered history plus a one-turn-at-a-time guard.
//!
//! Turn states move `Idle → Awaiting → Settled`. While a turn is awaiting a
//! reply further submissions are rejected. Every accepted submission ends
//! with exactly one assistant message in the history, even when the model
//! is unreachable or the caller stops waiting.

use crate::pipeline::Assistant;
use rxpilot_core::message::{Conversation, ConversationId, Message};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Shown when the model could not be reached. Carries no intent tag.
pub const APOLOGY: &str =
    "I'm sorry, I couldn't reach the medical assistant service right now. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn submitted yet.
    Idle,
    /// A reply is outstanding.
    Awaiting,
    /// The last turn has its assistant message.
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a reply is still pending for this session")]
    TurnInFlight,

    #[error("message is empty")]
    EmptyUtterance,
}

struct SessionState {
    conversation: Conversation,
    turn: TurnState,
}

pub struct ConversationSession {
    id: ConversationId,
    owner_email: Option<String>,
    assistant: Arc<Assistant>,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    pub fn new(assistant: Arc<Assistant>, owner_email: Option<String>) -> Self {
        Self::with_id(ConversationId::new(), assistant, owner_email)
    }

    pub fn with_id(id: ConversationId, assistant: Arc<Assistant>, owner_email: Option<String>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                conversation: Conversation::with_id(id.clone()),
                turn: TurnState::Idle,
            }),
            id,
            owner_email,
            assistant,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn owner_email(&self) -> Option<&str> {
        self.owner_email.as_deref()
    }

    pub fn turn_state(&self) -> TurnState {
        self.lock().turn
    }

    /// A snapshot of the history, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.lock().conversation.messages().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Submit one utterance and wait for its assistant message.
    pub async fn submit(&self, utterance: &str) -> Result<Message, SessionError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(SessionError::EmptyUtterance);
        }

        {
            let mut state = self.lock();
            if state.turn == TurnState::Awaiting {
                return Err(SessionError::TurnInFlight);
            }
            state.turn = TurnState::Awaiting;
            state.conversation.push(Message::user(utterance));
        }

        let mut pending = PendingTurn { session: self, settled: false };

        let reply = match self.assistant.respond(utterance, self.owner_email.as_deref()).await {
            Ok(reply) => Message::assistant(reply.markup).tagged(reply.intent),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Turn failed, replying with apology");
                Message::assistant(APOLOGY)
            }
        };

        pending.settle(reply.clone());
        Ok(reply)
    }

    fn settle(&self, message: Message) {
        let mut state = self.lock();
        state.conversation.push(message);
        state.turn = TurnState::Settled;
    }
}

/// Settles an abandoned turn with the apology so the session never stays
/// stuck in `Awaiting`.
struct PendingTurn<'a> {
    session: &'a ConversationSession,
    settled: bool,
}

impl PendingTurn<'_> {
    fn settle(&mut self, message: Message) {
        self.settled = true;
        self.session.settle(message);
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(session = %self.session.id, "Turn abandoned before the reply arrived");
            self.session.settle(Message::assistant(APOLOGY));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::PromptComposer;
    use crate::test_helpers::{CountingStore, FailingGateway, ScriptedGateway, SlowGateway};
    use rxpilot_core::gateway::Gateway;
    use rxpilot_core::intent::IntentCategory;
    use rxpilot_core::message::Role;
    use rxpilot_core::provider::GenerationParams;
    use rxpilot_store::PrescriptionLookup;
    use std::time::Duration;

    fn session_with(gateway: Arc<dyn Gateway>) -> Arc<ConversationSession> {
        let assistant = Assistant::new(
            gateway,
            PromptComposer::new("gemini-pro", GenerationParams::default()),
        )
        .with_lookup(PrescriptionLookup::new(Arc::new(CountingStore::with_text(
            "Amoxicillin - 500mg",
        ))));
        Arc::new(ConversationSession::new(
            Arc::new(assistant),
            Some("ana@example.com".into()),
        ))
    }

    #[tokio::test]
    async fn successful_turn_appends_tagged_reply() {
        let session = session_with(Arc::new(ScriptedGateway::new("PRESCRIPTION: Amoxicillin")));
        assert_eq!(session.turn_state(), TurnState::Idle);

        let reply = session.submit("what is my prescription?").await.unwrap();
        assert_eq!(reply.intent, Some(IntentCategory::PrescriptionLookup));
        assert!(reply.content.contains("callout-prescription"));

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "what is my prescription?");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(session.turn_state(), TurnState::Settled);
    }

    #[tokio::test]
    async fn gateway_failure_settles_with_untagged_apology() {
        let session = session_with(Arc::new(FailingGateway));

        let reply = session.submit("what causes a sore throat?").await.unwrap();
        assert_eq!(reply.content, APOLOGY);
        assert!(reply.intent.is_none());
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.turn_state(), TurnState::Settled);
    }

    #[tokio::test]
    async fn empty_utterance_rejected_without_state_change() {
        let session = session_with(Arc::new(ScriptedGateway::new("x")));
        assert!(matches!(
            session.submit("   ").await,
            Err(SessionError::EmptyUtterance)
        ));
        assert!(session.history().is_empty());
        assert_eq!(session.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn second_submission_while_awaiting_is_rejected() {
        let session = session_with(Arc::new(SlowGateway {
            delay: Duration::from_millis(200),
        }));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("first question").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(session.turn_state(), TurnState::Awaiting);
        assert!(matches!(
            session.submit("second question").await,
            Err(SessionError::TurnInFlight)
        ));

        first.await.unwrap().unwrap();
        // One user message and one reply: the rejected turn left no trace.
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.turn_state(), TurnState::Settled);
    }

    #[tokio::test]
    async fn abandoned_turn_still_settles() {
        let session = session_with(Arc::new(SlowGateway {
            delay: Duration::from_secs(3600),
        }));

        let result =
            tokio::time::timeout(Duration::from_millis(20), session.submit("anyone there?")).await;
        assert!(result.is_err());

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, APOLOGY);
        assert_eq!(session.turn_state(), TurnState::Settled);
    }

    #[tokio::test]
    async fn turns_alternate_in_order() {
        let session = session_with(Arc::new(ScriptedGateway::new("answer")));
        session.submit("one").await.unwrap();
        session.submit("two").await.unwrap();

        let contents: Vec<String> = session.history().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "answer", "two", "answer"]);
    }
}
