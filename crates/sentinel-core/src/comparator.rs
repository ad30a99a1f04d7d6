//! Cross-model agreement judgment.
//!
//! The comparator hands the canonical text of both analyses to a judge
//! backend and returns the judge's verdict unchanged apart from validation
//! and a timestamp. It performs no numeric computation of its own.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::backend::{number_field, text_field, FieldKind, FieldMap, ModelBackend, TaskSpec};
use crate::domain::{ComparisonError, StructuredResult};
use crate::metrics::METRICS;
use crate::obs;

/// Task name of the agreement judgment.
pub const COMPARISON_TASK: &str = "analysis_comparison";

/// The judgment signature: two serialized analyses in, a verdict out.
pub fn comparison_task() -> TaskSpec {
    TaskSpec::new(
        COMPARISON_TASK,
        "Compare two analyses of the same installation log and identify where they differ.",
    )
    .input("local_analysis", "Analysis produced by the locally hosted model")
    .input("cloud_analysis", "Analysis produced by the cloud-hosted model")
    .output(
        "differences",
        "Description of the differences between the two analyses",
        FieldKind::Text,
    )
    .output(
        "agreement_score",
        "How closely the analyses agree, from 0.0 (disagree) to 1.0 (identical)",
        FieldKind::Number,
    )
    .output(
        "recommendation",
        "Which analysis to trust and what to do next",
        FieldKind::Text,
    )
}

/// Verdict of the agreement judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub differences: String,
    /// Scale is defined by the judge; only ordering is meaningful.
    pub agreement_score: f64,
    pub recommendation: String,
    pub timestamp: DateTime<Utc>,
}

/// Produces a [`ComparisonReport`] for a pair of structured results.
#[derive(Clone)]
pub struct AgreementComparator {
    judge: Arc<dyn ModelBackend>,
    task: TaskSpec,
}

impl std::fmt::Debug for AgreementComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgreementComparator")
            .field("judge", &self.judge.name())
            .finish()
    }
}

impl AgreementComparator {
    pub fn new(judge: Arc<dyn ModelBackend>) -> Self {
        Self {
            judge,
            task: comparison_task(),
        }
    }

    pub fn judge_name(&self) -> &str {
        self.judge.name()
    }

    /// Judge how closely `local` and `cloud` agree.
    #[instrument(skip_all, fields(judge = %self.judge.name()))]
    pub async fn compare(
        &self,
        local: &StructuredResult,
        cloud: &StructuredResult,
    ) -> Result<ComparisonReport, ComparisonError> {
        let result = self.judge_pair(local, cloud).await;
        match &result {
            Ok(report) => {
                METRICS.inc_comparisons();
                obs::emit_comparison_finished(self.judge.name(), report.agreement_score);
            }
            Err(e) => obs::emit_comparison_failed(self.judge.name(), e),
        }
        result
    }

    async fn judge_pair(
        &self,
        local: &StructuredResult,
        cloud: &StructuredResult,
    ) -> Result<ComparisonReport, ComparisonError> {
        let mut inputs = FieldMap::new();
        inputs.insert(
            "local_analysis".to_string(),
            Value::String(local.canonical_text()?),
        );
        inputs.insert(
            "cloud_analysis".to_string(),
            Value::String(cloud.canonical_text()?),
        );

        let fields = self
            .judge
            .invoke(&self.task, &inputs)
            .await
            .map_err(|source| ComparisonError::Judge {
                backend: self.judge.name().to_string(),
                source,
            })?;

        Ok(ComparisonReport {
            differences: text_field(&fields, "differences")?,
            agreement_score: number_field(&fields, "agreement_score")?,
            recommendation: text_field(&fields, "recommendation")?,
            timestamp: Utc::now(),
        })
    }
}
