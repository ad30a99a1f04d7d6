//! Sentinel Core Library
//!
//! Dual-model analysis of installation logs: structured extraction against a
//! local and a cloud backend, an agreement judgment between the two, and
//! quality scoring with batch aggregation.

pub mod aggregate;
pub mod backend;
pub mod comparator;
pub mod domain;
pub mod dual_runner;
pub mod extractor;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod report;
pub mod scoring;
pub mod telemetry;

pub use aggregate::{
    aggregate_scores, compare_evaluations, AggregateStats, BatchAggregator, BatchConfig,
    BatchReport, ComparisonEntry, ComparisonEvaluation, MissingScorePolicy,
};
pub use backend::{FieldKind, FieldMap, FieldSpec, ModelBackend, TaskSpec};
pub use comparator::{comparison_task, AgreementComparator, ComparisonReport, COMPARISON_TASK};
pub use domain::{
    BackendError, ComparisonError, DualRunError, ExtractionError, FieldError, MetricError,
    Severity, SourceId, StructuredResult, TestCase, INSTALLATION_LOG_CONTEXT,
};
pub use dual_runner::{DualResult, DualRunner, FailurePolicy, RunnerConfig, SourceOutcome};
pub use extractor::{log_analysis_task, StructuredExtractor, LOG_ANALYSIS_TASK};
pub use scoring::{
    EvaluationResult, JudgeMetric, Measurement, MetricResult, MetricScorer, MetricThresholds,
    QualityScorer, RegisteredMetric,
};

/// Sentinel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
