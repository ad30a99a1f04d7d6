//! OpenAI-compatible chat-completions backend
//!
//! Serves both the local backend (Ollama's `/v1` compatibility API) and the
//! cloud backend; only the [`BackendConfig`] differs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use sentinel_core::{BackendError, FieldMap, ModelBackend, TaskSpec};

use crate::config::BackendConfig;
use crate::error::ConfigError;
use crate::prompt::{parse_reply, render_system, render_user};

const USER_AGENT: &str = concat!("sentinel-llm/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`ModelBackend`] over an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiCompatBackend {
    name: String,
    config: BackendConfig,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatBackend")
            .field("name", &self.name)
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiCompatBackend {
    /// Build a backend, resolving the API key from the process environment.
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolve_api_key()?;
        Self::with_resolved_key(config, api_key)
    }

    /// Build a backend with an already-resolved key.
    pub fn with_resolved_key(
        config: BackendConfig,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiCompatBackend {
            name: config.model.clone(),
            config,
            api_key,
            http_client,
        })
    }

    /// Name reported in logs and errors (defaults to the model id).
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn request_body<'a>(&'a self, task: &TaskSpec, inputs: &FieldMap) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: render_system(task),
                },
                ChatMessage {
                    role: "user",
                    content: render_user(task, inputs),
                },
            ],
            temperature: self.config.temperature,
            response_format: self.config.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(backend = %self.name, task = %task.name))]
    async fn invoke(&self, task: &TaskSpec, inputs: &FieldMap) -> Result<FieldMap, BackendError> {
        let url = self.config.completions_url();
        let mut request = self
            .http_client
            .post(&url)
            .json(&self.request_body(task, inputs));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion rejected");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedReply(format!("response body: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::MalformedReply("reply has no message content".into()))?;

        debug!(chars = content.len(), "chat completion received");
        parse_reply(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::log_analysis_task;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let backend =
            OpenAiCompatBackend::with_resolved_key(BackendConfig::local_default(), None).unwrap();
        let mut inputs = FieldMap::new();
        inputs.insert("log_snippet".into(), json!("Error: disk full"));

        let body = serde_json::to_value(backend.request_body(&log_analysis_task(), &inputs)).unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "## log_snippet\nError: disk full");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected_at_construction() {
        let err = OpenAiCompatBackend::with_resolved_key(
            BackendConfig::new("ftp://example", "llama3"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_name_defaults_to_model() {
        let backend = OpenAiCompatBackend::with_resolved_key(
            BackendConfig::cloud_default(),
            Some("sk-test".into()),
        )
        .unwrap();
        assert_eq!(backend.name(), "gpt-4o");
        assert_eq!(backend.with_name("cloud").name(), "cloud");
    }
}
