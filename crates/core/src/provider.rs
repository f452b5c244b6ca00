//! Provider trait: the abstraction over language-model backends.
//!
//! A Provider knows how to send one composed request to a model and get the
//! generated text back. Provider-specific wire formats stay inside the
//! implementation; nothing else in the workspace sees them.
//!
//! Implementations: Gemini `generateContent`, OpenAI-compatible chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// Harm categories every request asks the provider to screen.
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// A request for one model generation.
///
/// Built fresh for every call; never reused across intents because the
/// system instruction differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "gemini-pro", "gpt-4o-mini")
    pub model: String,

    /// Persona and output-format instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// The conversation messages, oldest first
    pub messages: Vec<Message>,

    /// Sampling and safety parameters
    #[serde(default)]
    pub params: GenerationParams,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            messages,
            params: GenerationParams::default(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Generation parameters shared by every provider shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Safety thresholds; providers without a safety API ignore them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety: Vec<SafetySetting>,
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: Some(1),
            top_p: Some(1.0),
            max_tokens: Some(2048),
            safety: SafetySetting::standard("BLOCK_MEDIUM_AND_ABOVE"),
        }
    }
}

/// A per-category blocking threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    /// One setting per [`HARM_CATEGORIES`] entry, all at `threshold`.
    pub fn standard(threshold: &str) -> Vec<Self> {
        HARM_CATEGORIES
            .iter()
            .map(|category| Self {
                category: (*category).to_string(),
                threshold: threshold.to_string(),
            })
            .collect()
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Every model backend implements this trait. Callers go through the
/// [`Gateway`](crate::gateway::Gateway) and never learn which backend answered.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ModelRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Whether the provider is reachable.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
