//! Sentinel-LLM: OpenAI-compatible model backends for Sentinel
//!
//! Provides [`OpenAiCompatBackend`], a `ModelBackend` that talks to any
//! `/chat/completions` endpoint. The local backend targets Ollama, the cloud
//! backend targets OpenAI.

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;

pub use client::OpenAiCompatBackend;
pub use config::{BackendConfig, CLOUD_API_KEY_ENV};
pub use error::ConfigError;
pub use prompt::{parse_reply, render_system, render_user};
