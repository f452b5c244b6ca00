//! Model provider implementations for rxpilot.
//!
//! All providers implement the `rxpilot_core::Provider` trait.
//! The router selects the configured provider and wraps it in a
//! [`ProviderGateway`], which is what the rest of the workspace talks to.

pub mod gateway;
pub mod gemini;
mod http;
pub mod openai_compat;
pub mod router;

pub use gateway::ProviderGateway;
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, build_gateway, is_keyless};
