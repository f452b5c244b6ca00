//! End-to-end tests across the rxpilot crates.
//!
//! These wire real components together (provider gateway, HTTP document
//! store client, assistant pipeline, batch runner, SQLite sink) with only
//! the language model and the document store service mocked.

use std::sync::Arc;
use std::time::Duration;

use rxpilot_assistant::{APOLOGY, Assistant, ConversationSession, PromptComposer};
use rxpilot_config::{AppConfig, FailurePolicy};
use rxpilot_core::error::{NotifyError, ProviderError};
use rxpilot_core::intent::IntentCategory;
use rxpilot_core::notify::{Notification, Notifier};
use rxpilot_core::prescription::DocumentStore;
use rxpilot_core::provider::{GenerationParams, ModelRequest, Provider, ProviderResponse};
use rxpilot_providers::{GeminiProvider, ProviderGateway};
use rxpilot_store::{DocumentStoreClient, InMemoryTimingSink, PrescriptionLookup, SqliteTimingSink};
use rxpilot_workflow::{BatchError, BatchRunner, FailureKind};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Mocks ────────────────────────────────────────────────────────────────

/// Answers with a fixed text, fails on listed call numbers, records requests.
struct ScriptedProvider {
    reply: String,
    fail_on: Vec<usize>,
    requests: std::sync::Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    fn text(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            fail_on: vec![],
            requests: std::sync::Mutex::new(vec![]),
        }
    }

    fn failing_on(reply: &str, calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Self::text(reply)
        }
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_on.contains(&call) {
            return Err(ProviderError::Network("connection reset".into()));
        }
        Ok(ProviderResponse {
            text: self.reply.clone(),
            model: request.model,
            usage: None,
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<Notification>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn gateway(provider: Arc<dyn Provider>) -> Arc<ProviderGateway> {
    Arc::new(ProviderGateway::new(provider, Duration::from_secs(5)))
}

fn store(server: &MockServer) -> Arc<dyn DocumentStore> {
    Arc::new(DocumentStoreClient::new(server.uri(), Duration::from_secs(5)))
}

fn assistant(gateway: Arc<ProviderGateway>, store: Arc<dyn DocumentStore>) -> Arc<Assistant> {
    Arc::new(
        Assistant::new(
            gateway,
            PromptComposer::new("gemini-pro", GenerationParams::default()),
        )
        .with_lookup(PrescriptionLookup::new(store)),
    )
}

async fn mount_prescription(server: &MockServer, email: &str, text: &str) {
    Mock::given(method("GET"))
        .and(path("/user-prescriptions"))
        .and(query_param("user_email", email))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "prescriptions": [{
                "cleaned_text": text,
                "user_email": email,
                "timestamp": "2024-05-01 08:30:00"
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_pending(server: &MockServer, owners: &[&str]) {
    let data: Vec<_> = owners
        .iter()
        .map(|owner| json!({"user_email": owner, "cleaned_text": format!("Rx for {owner}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/all-cleaned-texts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .mount(server)
        .await;
}

// ── Interactive scenarios ────────────────────────────────────────────────

#[tokio::test]
async fn prescription_lookup_through_http_store() {
    let server = MockServer::start().await;
    mount_prescription(&server, "ana@example.com", "Amoxicillin - 500mg").await;

    let provider = Arc::new(ScriptedProvider::text(
        "PRESCRIPTION: one antibiotic\n- **Amoxicillin** 500mg *three times a day*",
    ));
    let session = ConversationSession::new(
        assistant(gateway(provider.clone()), store(&server)),
        Some("ana@example.com".into()),
    );

    let reply = session.submit("what is my prescription?").await.unwrap();

    assert_eq!(reply.intent, Some(IntentCategory::PrescriptionLookup));
    assert!(reply.content.contains("<div class=\"callout callout-prescription\">"));
    assert!(reply.content.contains("<li><strong>Amoxicillin</strong> 500mg <em>three times a day</em></li>"));

    let request = &provider.requests()[0];
    assert!(request.messages.last().unwrap().content.contains("Amoxicillin - 500mg"));
    assert_eq!(request.messages[0].content, rxpilot_assistant::composer::GREETING_PROMPT);
}

#[tokio::test]
async fn adherence_advice_uses_pharmacist_prompt() {
    let server = MockServer::start().await;
    mount_prescription(&server, "ana@example.com", "Metformin 500mg twice daily").await;

    let provider = Arc::new(ScriptedProvider::text("ADVICE take with meals"));
    let session = ConversationSession::new(
        assistant(gateway(provider.clone()), store(&server)),
        Some("ana@example.com".into()),
    );

    let reply = session.submit("How should I take my medication?").await.unwrap();
    assert_eq!(reply.intent, Some(IntentCategory::AdherenceAdvice));
    assert!(reply.content.contains("callout-advice"));

    let instruction = provider.requests()[0].system_instruction.clone().unwrap();
    assert!(instruction.contains("pharmacist"));
}

#[tokio::test]
async fn general_question_never_touches_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user-prescriptions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = Arc::new(ScriptedProvider::text("Usually a virus."));
    let session = ConversationSession::new(
        assistant(gateway(provider), store(&server)),
        Some("ana@example.com".into()),
    );

    let reply = session.submit("what causes a sore throat?").await.unwrap();
    assert_eq!(reply.intent, Some(IntentCategory::GeneralQuestion));
    assert_eq!(reply.content, "Usually a virus.");
}

#[tokio::test]
async fn store_outage_falls_back_to_general_prompt() {
    let provider = Arc::new(ScriptedProvider::text("I can't see your records."));
    let unreachable: Arc<dyn DocumentStore> = Arc::new(DocumentStoreClient::new(
        "http://127.0.0.1:9",
        Duration::from_secs(1),
    ));
    let session = ConversationSession::new(
        assistant(gateway(provider.clone()), unreachable),
        Some("ana@example.com".into()),
    );

    let reply = session.submit("what is my prescription?").await.unwrap();
    assert_eq!(reply.intent, Some(IntentCategory::GeneralQuestion));
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn provider_failure_becomes_apology() {
    let server = MockServer::start().await;
    let provider = Arc::new(ScriptedProvider::failing_on("never", &[1]));
    let session = ConversationSession::new(assistant(gateway(provider), store(&server)), None);

    let reply = session.submit("what causes a sore throat?").await.unwrap();
    assert_eq!(reply.content, APOLOGY);
    assert!(reply.intent.is_none());
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn swapping_in_gemini_needs_no_other_change() {
    let model_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "## Rest\n- fluids"}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&model_server)
        .await;
    let store_server = MockServer::start().await;

    let gemini = Arc::new(GeminiProvider::new("test-key").with_base_url(model_server.uri()));
    let session = ConversationSession::new(assistant(gateway(gemini), store(&store_server)), None);

    let reply = session.submit("what helps a cold?").await.unwrap();
    assert_eq!(
        reply.content,
        "<h2 class=\"heading-general\">Rest</h2><br/><li>fluids</li>"
    );
}

// ── Batch scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn batch_persists_to_sqlite_and_notifies() {
    let server = MockServer::start().await;
    mount_pending(&server, &["a@x.io", "b@x.io"]).await;

    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("timings.db").display());
    let sink = Arc::new(SqliteTimingSink::new(&url).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());

    let runner = BatchRunner::new(
        gateway(Arc::new(ScriptedProvider::text("summary"))),
        store(&server),
        sink.clone(),
        notifier.clone(),
        "gemini-pro",
    );
    let summary = runner.run().await.unwrap();
    assert_eq!(summary.processed, 2);

    let records = sink.recent(10).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].owner_email, "b@x.io");
    assert_eq!(records[1].input_text, "Rx for a@x.io");
    assert_eq!(records[1].model_response, "summary");

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].body.contains("using the gemini-pro model"));
}

#[tokio::test]
async fn batch_aborts_after_first_failure_by_default() {
    let server = MockServer::start().await;
    mount_pending(&server, &["a@x.io", "b@x.io"]).await;

    let provider = Arc::new(ScriptedProvider::failing_on("ok", &[1]));
    let sink = InMemoryTimingSink::new();
    let config = AppConfig::default();
    let runner = BatchRunner::from_config(
        &config,
        gateway(provider.clone()),
        store(&server),
        Arc::new(sink.clone()),
        Arc::new(RecordingNotifier::default()),
    );

    let err = runner.run().await.unwrap_err();
    let BatchError::Aborted { failure, summary } = err else {
        panic!("expected abort");
    };
    assert_eq!(failure.index, 0);
    assert_eq!(failure.kind, FailureKind::Model);
    assert_eq!(summary.processed, 0);
    assert_eq!(provider.requests().len(), 1);
    assert!(sink.records().await.is_empty());
    assert_eq!(sink.open_sessions(), 0);
}

#[tokio::test]
async fn batch_continue_policy_from_config() {
    let server = MockServer::start().await;
    mount_pending(&server, &["a@x.io", "b@x.io"]).await;

    let mut config = AppConfig::default();
    config.batch.on_item_failure = FailurePolicy::Continue;
    let sink = InMemoryTimingSink::new();
    let runner = BatchRunner::from_config(
        &config,
        gateway(Arc::new(ScriptedProvider::failing_on("ok", &[1]))),
        store(&server),
        Arc::new(sink.clone()),
        Arc::new(RecordingNotifier::default()),
    );

    let summary = runner.run().await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(sink.records().await[0].owner_email, "b@x.io");
}

#[tokio::test]
async fn malformed_pending_payload_fails_before_any_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/all-cleaned-texts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let provider = Arc::new(ScriptedProvider::text("ok"));
    let sink = InMemoryTimingSink::new();
    let runner = BatchRunner::new(
        gateway(provider.clone()),
        store(&server),
        Arc::new(sink.clone()),
        Arc::new(RecordingNotifier::default()),
        "gemini-pro",
    );

    assert!(matches!(runner.run().await, Err(BatchError::Fetch(_))));
    assert!(provider.requests().is_empty());
    assert_eq!(sink.sessions_opened(), 0);
}
