//! Provider router: selects the correct model provider based on config.
//!
//! Handles provider creation and hands out the configured default wrapped
//! in a [`ProviderGateway`].

use crate::gateway::ProviderGateway;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use rxpilot_core::error::ProviderError;
use rxpilot_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Routes model requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

fn build_provider(name: &str, api_key: &str, api_url: Option<&str>) -> Option<Arc<dyn Provider>> {
    if name == "gemini" {
        let mut p = GeminiProvider::new(api_key);
        if let Some(url) = api_url {
            p = p.with_base_url(url);
        }
        return Some(Arc::new(p));
    }

    let Some(base_url) = api_url.map(String::from).or_else(|| default_base_url(name)) else {
        warn!(provider = %name, "Unknown provider without api_url, skipping");
        return None;
    };
    Some(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Build providers from configuration.
pub fn build_from_config(config: &rxpilot_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = config.api_key_for(name).unwrap_or_default();
        if let Some(provider) = build_provider(name, &api_key, provider_config.api_url.as_deref()) {
            router.register(name.clone(), provider);
        }
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        if let Some(provider) = build_provider(&config.default_provider, &api_key, None) {
            router.register(config.default_provider.clone(), provider);
        }
    }

    router
}

/// Build the gateway for the configured default provider and deadline.
pub fn build_gateway(config: &rxpilot_config::AppConfig) -> Result<ProviderGateway, ProviderError> {
    if !config.has_api_key() && !is_keyless(&config.default_provider) {
        warn!(provider = %config.default_provider, "No API key configured; model calls will fail");
    }

    let provider = build_from_config(config).default().ok_or_else(|| {
        ProviderError::NotConfigured(format!(
            "provider '{}' has no known endpoint; set providers.{}.api_url",
            config.default_provider, config.default_provider
        ))
    })?;

    Ok(ProviderGateway::new(
        provider,
        Duration::from_secs(config.generation.timeout_secs),
    ))
}

/// Local servers that accept any key.
pub fn is_keyless(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}
