//! Runtime configuration from environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown MODEL_PROVIDER '{0}' (expected 'gemini' or 'openrouter')")]
    UnknownProvider(String),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenRouter,
}

impl Provider {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash-exp",
            Provider::OpenRouter => "google/gemini-2.0-flash-exp:free",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Provider::Gemini => "Gemini",
            Provider::OpenRouter => "OpenRouter",
        };
        write!(f, "{}", s)
    }
}

/// Settings handed to a model gateway at construction.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub provider: Provider,
    /// `None` when the credential is missing; every run then fails with a configuration error.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `MODEL_PROVIDER`: `gemini` (default) or `openrouter`
    /// - `GEMINI_API_KEY` / `OPENROUTER_API_KEY`: credential for the provider
    /// - `MODEL_NAME`: model id (provider default otherwise)
    /// - `MODEL_BASE_URL`: API base URL (provider default otherwise)
    /// - `MODEL_TIMEOUT_SECS`: per-call timeout (default: 60)
    /// - `BIND_ADDR`: HTTP listen address (default: "0.0.0.0:8080")
    /// - `MAX_UPLOAD_BYTES`: request body limit (default: 10 MiB)
    ///
    /// A missing API key is not an error here.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = match lookup("MODEL_PROVIDER") {
            Some(value) => Provider::parse(&value)?,
            None => Provider::Gemini,
        };

        let mut gateway = GatewayConfig::new(
            provider,
            lookup(provider.api_key_var()).filter(|key| !key.trim().is_empty()),
        );
        if let Some(model) = lookup("MODEL_NAME") {
            gateway.model = model;
        }
        if let Some(base_url) = lookup("MODEL_BASE_URL") {
            gateway.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("MODEL_TIMEOUT_SECS") {
            gateway.timeout = Duration::from_secs(parse_number("MODEL_TIMEOUT_SECS", secs)?);
        }

        if gateway.api_key.is_none() {
            log::warn!(
                "⚠️ {} not set, every analysis will fail until it is configured",
                provider.api_key_var()
            );
        }

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => parse_number("MAX_UPLOAD_BYTES", value)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            gateway,
            bind_addr,
            max_upload_bytes,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, value })
}
