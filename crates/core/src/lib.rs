//! # rxpilot Core
//!
//! Domain types, traits, and error definitions for the rxpilot prescription
//! assistant. This crate has **no I/O of its own**: it defines the model that
//! the provider, store, assistant and workflow crates implement against.
//!
//! ## Seams
//!
//! Every external system is a trait here:
//! - [`Provider`]: a language-model backend (Gemini, OpenAI-compatible, ...)
//! - [`Gateway`]: the single entry point for model calls, returning a [`ModelResult`]
//! - [`DocumentStore`]: the service holding OCR'd prescription text
//! - [`TimingSink`]: where batch inference timings are persisted
//! - [`Notifier`]: where owner notifications are delivered

pub mod cron;
pub mod error;
pub mod gateway;
pub mod intent;
pub mod message;
pub mod notify;
pub mod prescription;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use cron::CronExpr;
pub use error::{EnrichmentUnavailable, GatewayError, NotifyError, ProviderError, StoreError};
pub use gateway::{Gateway, ModelResult};
pub use intent::IntentCategory;
pub use message::{Conversation, ConversationId, Message, Role};
pub use notify::{Notification, Notifier};
pub use prescription::{
    DocumentStore, InferenceTimingRecord, PendingItem, PrescriptionRecord, TimingSession,
    TimingSink,
};
pub use provider::{GenerationParams, ModelRequest, Provider, ProviderResponse, SafetySetting, Usage};
