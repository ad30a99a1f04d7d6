//! Dual-source orchestration.
//!
//! Runs the extraction task against the local backend and, optionally, the
//! cloud backend, then optionally attaches an agreement judgment. Both
//! backends are explicit constructor values; nothing is read from global
//! state, so independent runners can coexist in one process.
//!
//! The two extractions run concurrently and independently: neither observes
//! the other's outcome before both have completed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::backend::ModelBackend;
use crate::comparator::{AgreementComparator, ComparisonReport};
use crate::domain::{DualRunError, ExtractionError, SourceId, StructuredResult};
use crate::extractor::StructuredExtractor;
use crate::metrics::METRICS;
use crate::obs;

/// What to do when one side of a dual run fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure in the result and keep the other side.
    #[default]
    Partial,
    /// Fail the whole call on the first extraction or comparison failure.
    FailFast,
}

/// Configuration for a [`DualRunner`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub failure_policy: FailurePolicy,
}

/// Outcome for one source: a structured result or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceOutcome {
    Analyzed(StructuredResult),
    Failed { error: String },
}

impl SourceOutcome {
    pub fn result(&self) -> Option<&StructuredResult> {
        match self {
            SourceOutcome::Analyzed(result) => Some(result),
            SourceOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SourceOutcome::Analyzed(_) => None,
            SourceOutcome::Failed { error } => Some(error),
        }
    }
}

/// Results of one dual run, keyed by source identity.
///
/// Serializes as `{"local": .., "cloud": .., "comparison": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DualResult {
    #[serde(flatten)]
    pub sources: BTreeMap<SourceId, SourceOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,

    /// Set when a comparison was attempted and failed (partial policy only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_error: Option<String>,
}

impl DualResult {
    pub fn outcome(&self, source: SourceId) -> Option<&SourceOutcome> {
        self.sources.get(&source)
    }

    /// The structured result for `source`, if that side ran and succeeded.
    pub fn result(&self, source: SourceId) -> Option<&StructuredResult> {
        self.outcome(source).and_then(SourceOutcome::result)
    }

    /// The failure message for `source`, if that side ran and failed.
    pub fn error(&self, source: SourceId) -> Option<&str> {
        self.outcome(source).and_then(SourceOutcome::error)
    }

    /// True when every side that ran produced a result.
    pub fn is_complete(&self) -> bool {
        self.sources.values().all(|o| o.result().is_some())
    }
}

/// Orchestrates extraction against the local and cloud backends.
pub struct DualRunner {
    extractor: StructuredExtractor,
    local: Arc<dyn ModelBackend>,
    cloud: Arc<dyn ModelBackend>,
    comparator: AgreementComparator,
    config: RunnerConfig,
}

impl std::fmt::Debug for DualRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualRunner")
            .field("local", &self.local.name())
            .field("cloud", &self.cloud.name())
            .field("comparator", &self.comparator)
            .field("config", &self.config)
            .finish()
    }
}

impl DualRunner {
    /// Create a runner whose agreement judge is the cloud backend.
    pub fn new(local: Arc<dyn ModelBackend>, cloud: Arc<dyn ModelBackend>) -> Self {
        let comparator = AgreementComparator::new(Arc::clone(&cloud));
        Self {
            extractor: StructuredExtractor::new(),
            local,
            cloud,
            comparator,
            config: RunnerConfig::default(),
        }
    }

    /// Use a different judge for the agreement comparison.
    pub fn with_comparator(mut self, comparator: AgreementComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Analyse `log_snippet` with the local backend and, when `use_both` is
    /// set, the cloud backend. When `compare` is set and both sides
    /// succeeded, attach an agreement judgment.
    #[instrument(skip(self, log_snippet), fields(policy = ?self.config.failure_policy))]
    pub async fn run(
        &self,
        log_snippet: &str,
        use_both: bool,
        compare: bool,
    ) -> Result<DualResult, DualRunError> {
        let local_fut = self.extract_from(SourceId::Local, log_snippet);
        let cloud_fut = async {
            if use_both {
                Some(self.extract_from(SourceId::Cloud, log_snippet).await)
            } else {
                None
            }
        };
        let (local, cloud) = tokio::join!(local_fut, cloud_fut);

        let mut outcomes = vec![(SourceId::Local, local)];
        if let Some(cloud) = cloud {
            outcomes.push((SourceId::Cloud, cloud));
        }

        let mut sources = BTreeMap::new();
        for (source_id, outcome) in outcomes {
            let outcome = match outcome {
                Ok(result) => SourceOutcome::Analyzed(result),
                Err(source) => {
                    if self.config.failure_policy == FailurePolicy::FailFast {
                        return Err(DualRunError::Extraction { source_id, source });
                    }
                    SourceOutcome::Failed {
                        error: source.to_string(),
                    }
                }
            };
            sources.insert(source_id, outcome);
        }

        let mut result = DualResult {
            sources,
            comparison: None,
            comparison_error: None,
        };

        if compare {
            let judged = match (
                result.result(SourceId::Local),
                result.result(SourceId::Cloud),
            ) {
                (Some(local), Some(cloud)) => Some(self.comparator.compare(local, cloud).await),
                _ => {
                    info!("comparison skipped: both sources must succeed");
                    None
                }
            };
            match judged {
                Some(Ok(report)) => result.comparison = Some(report),
                Some(Err(e)) if self.config.failure_policy == FailurePolicy::FailFast => {
                    return Err(e.into());
                }
                Some(Err(e)) => result.comparison_error = Some(e.to_string()),
                None => {}
            }
        }

        Ok(result)
    }

    async fn extract_from(
        &self,
        source: SourceId,
        log_snippet: &str,
    ) -> Result<StructuredResult, ExtractionError> {
        let backend = match source {
            SourceId::Local => &self.local,
            SourceId::Cloud => &self.cloud,
        };

        let outcome = self.extractor.extract(log_snippet, backend.as_ref()).await;
        METRICS.inc_extraction(outcome.is_ok());
        match &outcome {
            Ok(result) => obs::emit_extraction_finished(source, backend.name(), result.severity),
            Err(e) => obs::emit_extraction_failed(source, backend.name(), e),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    #[test]
    fn test_dual_result_serializes_sources_by_name() {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::Local,
            SourceOutcome::Analyzed(StructuredResult {
                severity: Severity::Error,
                category: "Dependency".to_string(),
                pattern_matched: "Failed to install".to_string(),
                suggested_action: "Retry".to_string(),
                learning_candidate: false,
            }),
        );
        sources.insert(
            SourceId::Cloud,
            SourceOutcome::Failed {
                error: "missing required field: category".to_string(),
            },
        );
        let result = DualResult {
            sources,
            comparison: None,
            comparison_error: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["local"]["severity"], "ERROR");
        assert_eq!(json["cloud"]["error"], "missing required field: category");
        assert!(json.get("comparison").is_none());
        assert!(!result.is_complete());
    }

    #[test]
    fn test_runner_config_defaults_to_partial() {
        let config: RunnerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Partial);

        let config: RunnerConfig =
            serde_json::from_str(r#"{"failure_policy": "fail_fast"}"#).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
    }
}
