//! Per-metric and per-case scoring results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::TestCase;

/// Outcome of one metric on one test case.
///
/// Either the metric produced a score (and `passed == score >= threshold`),
/// or it failed (and `passed` is false). Use the constructors; they are the
/// only place `passed` is computed. Deserializing rejects payloads whose
/// `passed` disagrees with that rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawMetricResult")]
pub enum MetricResult {
    Scored {
        score: f64,
        threshold: f64,
        passed: bool,
        reason: Option<String>,
    },
    Failed {
        error: String,
        passed: bool,
    },
}

/// Wire shape of [`MetricResult`] before the `passed` check.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMetricResult {
    Scored {
        score: f64,
        threshold: f64,
        passed: bool,
        reason: Option<String>,
    },
    Failed {
        error: String,
        passed: bool,
    },
}

impl TryFrom<RawMetricResult> for MetricResult {
    type Error = String;

    fn try_from(raw: RawMetricResult) -> Result<Self, Self::Error> {
        match raw {
            RawMetricResult::Scored {
                score,
                threshold,
                passed,
                reason,
            } => {
                if passed != (score >= threshold) {
                    return Err(format!(
                        "inconsistent metric result: passed={passed}, score={score}, threshold={threshold}"
                    ));
                }
                Ok(MetricResult::scored(score, threshold, reason))
            }
            RawMetricResult::Failed { error, passed } => {
                if passed {
                    return Err(format!("failed metric result marked passed: {error}"));
                }
                Ok(MetricResult::failed(error))
            }
        }
    }
}

impl MetricResult {
    pub fn scored(score: f64, threshold: f64, reason: Option<String>) -> Self {
        MetricResult::Scored {
            score,
            threshold,
            passed: score >= threshold,
            reason,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        MetricResult::Failed {
            error: error.into(),
            passed: false,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            MetricResult::Scored { score, .. } => Some(*score),
            MetricResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MetricResult::Scored { .. } => None,
            MetricResult::Failed { error, .. } => Some(error),
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            MetricResult::Scored { passed, .. } | MetricResult::Failed { passed, .. } => *passed,
        }
    }
}

/// All metric results for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub test_case: TestCase,
    pub results: BTreeMap<String, MetricResult>,
    pub timestamp: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn score(&self, metric: &str) -> Option<f64> {
        self.results.get(metric).and_then(MetricResult::score)
    }

    /// True when every metric scored and passed.
    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.results.values().all(MetricResult::passed)
    }

    /// Names of metrics that failed to produce a score.
    pub fn failed_metrics(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.error().is_some())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
