//! Backend configuration
//!
//! A backend is an OpenAI-compatible chat-completions endpoint. The local
//! backend defaults to Ollama's compatibility API; the cloud backend defaults
//! to OpenAI and reads its key from the environment.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";
pub const LOCAL_MODEL: &str = "llama3";
/// Ollama ignores the key but the API shape requires one.
pub const LOCAL_PLACEHOLDER_KEY: &str = "ollama";

pub const CLOUD_BASE_URL: &str = "https://api.openai.com/v1";
pub const CLOUD_MODEL: &str = "gpt-4o";
pub const CLOUD_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Chat-completions backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL up to and including the API version segment
    pub base_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Literal API key (takes precedence over `api_key_env`)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Request `response_format: json_object`
    #[serde(default)]
    pub json_mode: bool,
}

fn default_timeout_secs() -> u64 {
    120
}

impl BackendConfig {
    pub fn new(base_url: &str, model: &str) -> Self {
        BackendConfig {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
            temperature: None,
            json_mode: false,
        }
    }

    /// Local Ollama endpoint
    pub fn local_default() -> Self {
        Self::new(LOCAL_BASE_URL, LOCAL_MODEL)
            .with_api_key(LOCAL_PLACEHOLDER_KEY)
            .with_json_mode(true)
    }

    /// OpenAI endpoint, key from `OPENAI_API_KEY`
    pub fn cloud_default() -> Self {
        Self::new(CLOUD_BASE_URL, CLOUD_MODEL).with_api_key_env(CLOUD_API_KEY_ENV)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_api_key_env(mut self, var: &str) -> Self {
        self.api_key_env = Some(var.to_string());
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    /// Resolve the API key using the process environment
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        self.resolve_api_key_with(|var| std::env::var(var).ok())
    }

    /// Resolve the API key with an explicit environment lookup.
    ///
    /// A literal key wins. Otherwise a named env var must be set and
    /// non-empty. With neither, the backend is unauthenticated.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<Option<String>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = &self.api_key {
            return Ok(Some(key.clone()));
        }
        match &self.api_key_env {
            Some(var) => match lookup(var) {
                Some(key) if !key.trim().is_empty() => Ok(Some(key)),
                _ => Err(ConfigError::MissingApiKey {
                    env_var: var.clone(),
                }),
            },
            None => Ok(None),
        }
    }

    /// Check base URL and model before a client is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        Ok(())
    }

    /// `{base_url}/chat/completions`
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
