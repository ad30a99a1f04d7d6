//! The metric scorer boundary and the standard metric names/thresholds.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{MetricError, TestCase};

pub const RELEVANCE: &str = "relevance";
pub const HALLUCINATION: &str = "hallucination";
pub const ANSWER_RELEVANCY: &str = "answer_relevancy";
pub const FAITHFULNESS: &str = "faithfulness";

/// What a metric returns on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub score: f64,
    pub reason: Option<String>,
}

impl Measurement {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A pluggable quality metric.
///
/// The scoring algorithm is entirely the implementation's concern; the
/// scorer only records what comes back.
#[async_trait]
pub trait MetricScorer: Send + Sync {
    async fn measure(&self, case: &TestCase) -> Result<Measurement, MetricError>;
}

/// A metric bound to its name and pass/fail threshold.
#[derive(Clone)]
pub struct RegisteredMetric {
    pub name: String,
    pub threshold: f64,
    pub scorer: Arc<dyn MetricScorer>,
}

impl std::fmt::Debug for RegisteredMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredMetric")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl RegisteredMetric {
    pub fn new(name: impl Into<String>, threshold: f64, scorer: Arc<dyn MetricScorer>) -> Self {
        Self {
            name: name.into(),
            threshold,
            scorer,
        }
    }
}

/// Pass/fail thresholds for the four standard metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricThresholds {
    pub relevance: f64,
    pub hallucination: f64,
    pub answer_relevancy: f64,
    pub faithfulness: f64,
}

impl Default for MetricThresholds {
    fn default() -> Self {
        Self {
            relevance: 0.7,
            hallucination: 0.5,
            answer_relevancy: 0.7,
            faithfulness: 0.7,
        }
    }
}

impl MetricThresholds {
    /// `(metric name, threshold)` pairs in a fixed order.
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            (RELEVANCE, self.relevance),
            (HALLUCINATION, self.hallucination),
            (ANSWER_RELEVANCY, self.answer_relevancy),
            (FAITHFULNESS, self.faithfulness),
        ]
    }
}
