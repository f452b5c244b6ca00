//! Configuration loading, validation, and management for rxpilot.
//!
//! Loads configuration from `~/.rxpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use rxpilot_core::cron::CronExpr;
use rxpilot_core::provider::{GenerationParams, SafetySetting};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.rxpilot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model provider ("gemini", "openai", "openrouter", ...)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling, safety and deadline settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Where prescriptions and pending texts are read from
    #[serde(default)]
    pub document_store: DocumentStoreConfig,

    /// Where batch timing records are written
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Owner notification mail settings
    #[serde(default)]
    pub mail: MailConfig,

    /// Batch runner behaviour
    #[serde(default)]
    pub batch: BatchConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-pro".into()
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("generation", &self.generation)
            .field("providers", &self.providers)
            .field("document_store", &self.document_store)
            .field("persistence", &self.persistence)
            .field("mail", &self.mail)
            .field("batch", &self.batch)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("from", &self.from)
            .field("subject", &self.subject)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Applied to every harm category the provider screens
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,

    /// Deadline for a single model call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    1
}
fn default_top_p() -> f32 {
    1.0
}
fn default_max_output_tokens() -> u32 {
    2048
}
fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".into()
}
fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            safety_threshold: default_safety_threshold(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    /// The per-request parameters this configuration describes.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            top_k: Some(self.top_k),
            top_p: Some(self.top_p),
            max_tokens: Some(self.max_output_tokens),
            safety: SafetySetting::standard(&self.safety_threshold),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    #[serde(default = "default_document_store_url")]
    pub base_url: String,

    #[serde(default = "default_document_store_timeout")]
    pub timeout_secs: u64,
}

fn default_document_store_url() -> String {
    "http://localhost:8000".into()
}
fn default_document_store_timeout() -> u64 {
    30
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_document_store_url(),
            timeout_secs: default_document_store_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// `sqlite://...` or `postgres://...`
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "sqlite://inference_timings.db".into()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Sender address; falls back to `username`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default = "default_mail_subject")]
    pub subject: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    465
}
fn default_mail_subject() -> String {
    "Model Inference Time".into()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from: None,
            subject: default_mail_subject(),
        }
    }
}

impl MailConfig {
    /// Whether enough is set to actually send mail.
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.username.as_deref())
    }
}

/// What the batch runner does when one item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run at the first failing item.
    #[default]
    Abort,
    /// Record the failure and move on to the next item.
    Continue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub on_item_failure: FailurePolicy,

    /// Cron expression (5-field: minute hour dom month dow) for periodic runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.rxpilot/config.toml).
    ///
    /// Environment variables take priority over the file, except for the
    /// API key, where a key written in the file wins:
    /// - `RXPILOT_API_KEY`, then `GEMINI_API_KEY`, then `OPENAI_API_KEY`
    ///   (only when the file sets no `api_key`)
    /// - `RXPILOT_PROVIDER`, `RXPILOT_MODEL` / `GEMINI_MODEL`
    /// - `DOCUMENT_STORE_URL`, `DATABASE_URL`
    /// - `MAIL_USER` / `GMAIL_USER`, `MAIL_PASS` / `GMAIL_PASS`, `MAIL_SMTP_HOST`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if self.api_key.is_none() {
            self.api_key = first(&["RXPILOT_API_KEY", "GEMINI_API_KEY", "OPENAI_API_KEY"]);
        }
        if let Some(provider) = first(&["RXPILOT_PROVIDER"]) {
            self.default_provider = provider;
        }
        if let Some(model) = first(&["RXPILOT_MODEL", "GEMINI_MODEL"]) {
            self.default_model = model;
        }
        if let Some(url) = first(&["DOCUMENT_STORE_URL"]) {
            self.document_store.base_url = url;
        }
        if let Some(url) = first(&["DATABASE_URL"]) {
            self.persistence.database_url = url;
        }
        if let Some(user) = first(&["MAIL_USER", "GMAIL_USER"]) {
            self.mail.username = Some(user);
        }
        if let Some(pass) = first(&["MAIL_PASS", "GMAIL_PASS"]) {
            self.mail.password = Some(pass);
        }
        if let Some(host) = first(&["MAIL_SMTP_HOST"]) {
            self.mail.smtp_host = host;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rxpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if generation.top_p <= 0.0 || generation.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0.0, 1.0]".into(),
            ));
        }

        if generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }

        if self.document_store.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "document_store.timeout_secs must be > 0".into(),
            ));
        }

        if let Some(schedule) = &self.batch.schedule {
            CronExpr::parse(schedule).map_err(|e| {
                ConfigError::ValidationError(format!("batch.schedule '{schedule}': {e}"))
            })?;
        }

        Ok(())
    }

    /// The API key for `provider`: its own section first, then the global key.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// The model for the default provider, honouring a per-provider override.
    pub fn model(&self) -> String {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key_for(&self.default_provider).is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            generation: GenerationConfig::default(),
            providers: HashMap::new(),
            document_store: DocumentStoreConfig::default(),
            persistence: PersistenceConfig::default(),
            mail: MailConfig::default(),
            batch: BatchConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
