//! The per-turn pipeline: classify → look up → compose → invoke → format.

use crate::composer::PromptComposer;
use crate::formatter::ResponseFormatter;
use crate::intent::IntentClassifier;
use rxpilot_core::error::GatewayError;
use rxpilot_core::gateway::Gateway;
use rxpilot_core::intent::IntentCategory;
use rxpilot_store::PrescriptionLookup;
use std::sync::Arc;
use tracing::{debug, info};

/// A formatted answer and the intent whose rules formatted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub intent: IntentCategory,
    pub markup: String,
}

/// Stateless answering pipeline, shared by every session.
pub struct Assistant {
    classifier: IntentClassifier,
    composer: PromptComposer,
    formatter: ResponseFormatter,
    lookup: Option<PrescriptionLookup>,
    gateway: Arc<dyn Gateway>,
}

impl Assistant {
    pub fn new(gateway: Arc<dyn Gateway>, composer: PromptComposer) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            composer,
            formatter: ResponseFormatter::new(),
            lookup: None,
            gateway,
        }
    }

    /// Enable prescription enrichment.
    pub fn with_lookup(mut self, lookup: PrescriptionLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Answer one utterance. The only failure is the gateway's.
    pub async fn respond(
        &self,
        utterance: &str,
        owner_email: Option<&str>,
    ) -> Result<Reply, GatewayError> {
        let category = self.classifier.classify(utterance);

        let record = match (&self.lookup, category.needs_prescription()) {
            (Some(lookup), true) => lookup.fetch(owner_email).await,
            _ => None,
        };

        let turn = self.composer.compose(category, utterance, record.as_ref());
        info!(
            classified = %category,
            intent = %turn.intent,
            enriched = record.is_some(),
            model = %self.composer.model(),
            "Composed turn"
        );

        let raw = self.gateway.invoke(turn.request).await?;
        debug!(chars = raw.len(), "Formatting model reply");

        Ok(Reply {
            intent: turn.intent,
            markup: self.formatter.format(turn.intent, &raw),
        })
    }
}
