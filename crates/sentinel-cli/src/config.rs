//! TOML configuration for the `sentinel` binary.
//!
//! Every table is optional. Backend tables override individual fields of the
//! built-in local/cloud defaults; `[judge]` overrides the cloud settings for
//! the agreement and metric judge.
//!
//! ```toml
//! [local]
//! model = "mistral"
//!
//! [cloud]
//! model = "gpt-4o-mini"
//! api_key_env = "SENTINEL_CLOUD_KEY"
//!
//! [thresholds]
//! hallucination = 0.6
//!
//! [runner]
//! failure_policy = "fail_fast"
//!
//! [batch]
//! max_concurrent = 8
//! missing_score = "treat_as_zero"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sentinel_core::{BatchConfig, MetricThresholds, RunnerConfig};
use sentinel_llm::BackendConfig;

/// Field-level overrides for a [`BackendConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub json_mode: Option<bool>,
}

impl BackendOverrides {
    pub fn apply(&self, mut base: BackendConfig) -> BackendConfig {
        if let Some(url) = &self.base_url {
            base.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            base.model = model.clone();
        }
        // A configured env var replaces any literal default key, and vice versa.
        if let Some(var) = &self.api_key_env {
            base.api_key = None;
            base.api_key_env = Some(var.clone());
        }
        if let Some(key) = &self.api_key {
            base.api_key = Some(key.clone());
        }
        if let Some(secs) = self.timeout_secs {
            base.timeout_secs = secs;
        }
        if self.temperature.is_some() {
            base.temperature = self.temperature;
        }
        if let Some(json_mode) = self.json_mode {
            base.json_mode = json_mode;
        }
        base
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentinelConfig {
    pub local: BackendOverrides,
    pub cloud: BackendOverrides,
    pub judge: Option<BackendOverrides>,
    pub thresholds: MetricThresholds,
    pub runner: RunnerConfig,
    pub batch: BatchConfig,
}

impl SentinelConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read config {:?}", path))?;
                Self::from_toml(&raw).with_context(|| format!("parse config {:?}", path))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `--local-model` / `--cloud-model` (flag or env), which win over the file.
    pub fn with_model_overrides(mut self, local: Option<String>, cloud: Option<String>) -> Self {
        if local.is_some() {
            self.local.model = local;
        }
        if cloud.is_some() {
            self.cloud.model = cloud;
        }
        self
    }

    pub fn local_backend(&self) -> BackendConfig {
        self.local.apply(BackendConfig::local_default())
    }

    pub fn cloud_backend(&self) -> BackendConfig {
        self.cloud.apply(BackendConfig::cloud_default())
    }

    /// Judge backend config, if one is configured separately from cloud.
    pub fn judge_backend(&self) -> Option<BackendConfig> {
        self.judge.as_ref().map(|j| j.apply(self.cloud_backend()))
    }
}
