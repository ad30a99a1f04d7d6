//! Quality scoring of analyses.
//!
//! [`QualityScorer`] applies a fixed registry of named metrics, each with its
//! own threshold, to a test case. The central contract is isolation: a metric
//! that fails is recorded as [`MetricResult::Failed`] and the remaining
//! metrics are still scored.

pub mod judge;
pub mod metric;
pub mod result;
pub mod scorer;

pub use judge::JudgeMetric;
pub use metric::{
    Measurement, MetricScorer, MetricThresholds, RegisteredMetric, ANSWER_RELEVANCY,
    FAITHFULNESS, HALLUCINATION, RELEVANCE,
};
pub use result::{EvaluationResult, MetricResult};
pub use scorer::QualityScorer;
