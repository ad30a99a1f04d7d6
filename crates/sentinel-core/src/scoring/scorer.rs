//! Scoring a test case against the registered quality metrics.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, instrument};

use super::judge::JudgeMetric;
use super::metric::{MetricThresholds, RegisteredMetric};
use super::result::{EvaluationResult, MetricResult};
use crate::backend::ModelBackend;
use crate::domain::{MetricError, TestCase, INSTALLATION_LOG_CONTEXT};
use crate::metrics::METRICS;
use crate::obs;

/// Applies a fixed registry of named metrics to test cases.
///
/// The registry and its thresholds are fixed at construction. Each metric is
/// attempted exactly once per case; a failing metric is recorded as
/// [`MetricResult::Failed`] and never prevents the others from being scored.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    metrics: BTreeMap<String, RegisteredMetric>,
}

impl QualityScorer {
    /// Build a scorer from `metrics`. A later entry replaces an earlier one
    /// with the same name.
    pub fn new(metrics: impl IntoIterator<Item = RegisteredMetric>) -> Self {
        let metrics = metrics
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        Self { metrics }
    }

    /// The four standard metrics, each judged by `judge`.
    pub fn standard(judge: Arc<dyn ModelBackend>, thresholds: &MetricThresholds) -> Self {
        Self::new(thresholds.entries().into_iter().map(|(name, threshold)| {
            RegisteredMetric::new(
                name,
                threshold,
                Arc::new(JudgeMetric::for_metric(name, Arc::clone(&judge))),
            )
        }))
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn threshold(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|m| m.threshold)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Score `output` for `input` with every registered metric.
    pub async fn score(
        &self,
        input: &str,
        output: &str,
        expected: Option<&str>,
        context: Option<&str>,
    ) -> EvaluationResult {
        let mut case = TestCase::new(input, output);
        case.expected_output = expected.map(str::to_string);
        case.context = context.map(str::to_string);
        self.score_case(case).await
    }

    /// Evaluate one analysis of an installation log.
    pub async fn evaluate_analysis(
        &self,
        log_snippet: &str,
        analysis: &str,
        expected_severity: Option<&str>,
    ) -> EvaluationResult {
        self.score(
            log_snippet,
            analysis,
            expected_severity,
            Some(INSTALLATION_LOG_CONTEXT),
        )
        .await
    }

    #[instrument(skip_all, fields(case_id = %case.case_id, input_digest = %case.input_digest()))]
    pub async fn score_case(&self, case: TestCase) -> EvaluationResult {
        let scored = join_all(
            self.metrics
                .values()
                .map(|metric| Self::score_metric(metric, &case)),
        )
        .await;

        let results: BTreeMap<String, MetricResult> = scored.into_iter().collect();
        debug!(
            metrics = results.len(),
            failed = results.values().filter(|r| r.error().is_some()).count(),
            "case scored"
        );

        EvaluationResult {
            test_case: case,
            results,
            timestamp: Utc::now(),
        }
    }

    async fn score_metric(metric: &RegisteredMetric, case: &TestCase) -> (String, MetricResult) {
        let outcome = metric
            .scorer
            .measure(case)
            .await
            .and_then(|m| {
                if m.score.is_finite() {
                    Ok(m)
                } else {
                    Err(MetricError::InvalidScore {
                        score: m.score,
                        reason: "score is not finite".to_string(),
                    })
                }
            });

        let result = match outcome {
            Ok(measurement) => {
                let result =
                    MetricResult::scored(measurement.score, metric.threshold, measurement.reason);
                obs::emit_metric_scored(
                    &metric.name,
                    measurement.score,
                    metric.threshold,
                    result.passed(),
                );
                METRICS.inc_metric(true);
                result
            }
            Err(e) => {
                obs::emit_metric_failed(&metric.name, &e);
                METRICS.inc_metric(false);
                MetricResult::failed(e.to_string())
            }
        };
        (metric.name.clone(), result)
    }
}
