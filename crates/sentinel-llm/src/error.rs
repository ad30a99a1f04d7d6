//! Error types for sentinel-llm

use thiserror::Error;

/// Errors raised while building a backend from its configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required API key not set
    #[error("API key not found: set {env_var} or configure api_key")]
    MissingApiKey { env_var: String },

    /// Base URL is not http(s)
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Model name is empty
    #[error("Model name must not be empty")]
    EmptyModel,

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ConfigError {
    fn from(err: reqwest::Error) -> Self {
        ConfigError::Http(err.to_string())
    }
}
