//! Structured extraction of a log snippet against a single backend.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::backend::{FieldKind, FieldMap, ModelBackend, TaskSpec};
use crate::domain::{ExtractionError, StructuredResult};

/// Task name of the fixed extraction task.
pub const LOG_ANALYSIS_TASK: &str = "log_analysis";

/// The fixed extraction signature: one log snippet in, five fields out.
pub fn log_analysis_task() -> TaskSpec {
    TaskSpec::new(
        LOG_ANALYSIS_TASK,
        "Analyze installation log snippet for errors and issues.",
    )
    .input("log_snippet", "Installation log snippet to analyze")
    .output(
        "severity",
        "Severity level: INFO, WARN, ERROR, CRITICAL",
        FieldKind::Text,
    )
    .output(
        "category",
        "Error category: Network, Permission, Dependency, etc.",
        FieldKind::Text,
    )
    .output(
        "pattern_matched",
        "Specific error pattern detected",
        FieldKind::Text,
    )
    .output(
        "suggested_action",
        "Recommended action to resolve",
        FieldKind::Text,
    )
    .output(
        "learning_candidate",
        "Should this be added to learning log? (true/false)",
        FieldKind::Boolean,
    )
}

/// Runs the extraction task and validates the reply into a [`StructuredResult`].
///
/// Stateless apart from the task signature; one instance can serve any number
/// of backends concurrently. No retries are performed here.
#[derive(Debug, Clone)]
pub struct StructuredExtractor {
    task: TaskSpec,
}

impl Default for StructuredExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredExtractor {
    pub fn new() -> Self {
        Self {
            task: log_analysis_task(),
        }
    }

    pub fn task(&self) -> &TaskSpec {
        &self.task
    }

    #[instrument(skip_all, fields(backend = %backend.name(), snippet_len = log_snippet.len()))]
    pub async fn extract(
        &self,
        log_snippet: &str,
        backend: &dyn ModelBackend,
    ) -> Result<StructuredResult, ExtractionError> {
        let mut inputs = FieldMap::new();
        inputs.insert(
            "log_snippet".to_string(),
            Value::String(log_snippet.to_string()),
        );

        let fields = backend
            .invoke(&self.task, &inputs)
            .await
            .map_err(|source| ExtractionError::Backend {
                backend: backend.name().to_string(),
                source,
            })?;

        let result = StructuredResult::from_fields(&fields)?;
        debug!(severity = %result.severity, category = %result.category, "extraction validated");
        Ok(result)
    }
}
