//! The prescription-aware assistant.
//!
//! Turns a free-text question into a formatted answer:
//!
//! ```text
//! utterance → IntentClassifier → PrescriptionLookup (if needed)
//!           → PromptComposer → Gateway → ResponseFormatter
//! ```
//!
//! [`ConversationSession`] wraps the pipeline with an ordered history and
//! the one-turn-at-a-time rule.

pub mod composer;
pub mod formatter;
pub mod intent;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use composer::{ComposedTurn, PromptComposer};
pub use formatter::{Marker, ResponseFormatter, RewriteRule};
pub use intent::IntentClassifier;
pub use pipeline::{Assistant, Reply};
pub use session::{APOLOGY, ConversationSession, SessionError, TurnState};

/// Build the assistant from configuration.
///
/// Enrichment reads from `store` when one is given.
pub fn build_assistant(
    config: &rxpilot_config::AppConfig,
    gateway: std::sync::Arc<dyn rxpilot_core::Gateway>,
    store: Option<std::sync::Arc<dyn rxpilot_core::DocumentStore>>,
) -> Assistant {
    let composer = PromptComposer::new(config.model(), config.generation.params());
    let assistant = Assistant::new(gateway, composer);
    match store {
        Some(store) => assistant.with_lookup(rxpilot_store::PrescriptionLookup::new(store)),
        None => assistant,
    }
}
