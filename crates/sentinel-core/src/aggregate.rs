//! Batch aggregation and cross-source comparison of quality scores.
//!
//! Only numeric scores enter a reduction. A metric that failed on a case is
//! excluded from that metric's statistics (including `count`), never treated
//! as zero.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{SourceId, TestCase};
use crate::obs;
use crate::scoring::{EvaluationResult, QualityScorer};

/// How [`compare_evaluations`] treats a metric lacking a score on one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingScorePolicy {
    /// Leave the metric out of the comparison and list it as unscored.
    #[default]
    Exclude,
    /// Report the missing side as 0.0.
    TreatAsZero,
}

/// Configuration for a [`BatchAggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of cases scored concurrently.
    pub max_concurrent: usize,
    pub missing_score: MissingScorePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            missing_score: MissingScorePolicy::default(),
        }
    }
}

/// Summary statistics for one metric over a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Scored cases plus per-metric statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub individual_results: Vec<EvaluationResult>,
    pub aggregate_scores: BTreeMap<String, AggregateStats>,
    pub timestamp: DateTime<Utc>,
}

/// One metric compared across the two sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub local_score: f64,
    pub cloud_score: f64,
    /// `cloud_score - local_score`.
    pub difference: f64,
    /// Source with the strictly higher score; ties go to local.
    pub better: SourceId,
}

impl ComparisonEntry {
    pub fn new(local_score: f64, cloud_score: f64) -> Self {
        Self {
            local_score,
            cloud_score,
            difference: cloud_score - local_score,
            better: if cloud_score > local_score {
                SourceId::Cloud
            } else {
                SourceId::Local
            },
        }
    }
}

/// Quality scores of a local and a cloud analysis of the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEvaluation {
    pub local_evaluation: EvaluationResult,
    pub cloud_evaluation: EvaluationResult,
    pub comparison: BTreeMap<String, ComparisonEntry>,
    /// Metrics left out because a side had no score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unscored: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Reduce per-case results into per-metric statistics.
///
/// Metrics with no numeric score in any case are omitted.
pub fn aggregate_scores(results: &[EvaluationResult]) -> BTreeMap<String, AggregateStats> {
    let mut scores: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for eval in results {
        for (name, result) in &eval.results {
            let entry = scores.entry(name.as_str()).or_default();
            if let Some(score) = result.score() {
                entry.push(score);
            }
        }
    }

    scores
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| {
            let count = values.len();
            let sum: f64 = values.iter().sum();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            // Clamp guards against summation rounding pushing the mean outside [min, max].
            let mean = (sum / count as f64).clamp(min, max);
            (
                name.to_string(),
                AggregateStats {
                    mean,
                    min,
                    max,
                    count,
                },
            )
        })
        .collect()
}

/// Compare two evaluations metric by metric.
///
/// Returns the comparison table and the metrics that were left unscored.
pub fn compare_evaluations(
    local: &EvaluationResult,
    cloud: &EvaluationResult,
    policy: MissingScorePolicy,
) -> (BTreeMap<String, ComparisonEntry>, Vec<String>) {
    let mut names: Vec<&String> = local.results.keys().chain(cloud.results.keys()).collect();
    names.sort();
    names.dedup();

    let mut comparison = BTreeMap::new();
    let mut unscored = Vec::new();
    for name in names {
        let local_score = local.score(name);
        let cloud_score = cloud.score(name);
        let entry = match (local_score, cloud_score, policy) {
            (Some(l), Some(c), _) => ComparisonEntry::new(l, c),
            (l, c, MissingScorePolicy::TreatAsZero) => {
                ComparisonEntry::new(l.unwrap_or(0.0), c.unwrap_or(0.0))
            }
            (_, _, MissingScorePolicy::Exclude) => {
                unscored.push(name.clone());
                continue;
            }
        };
        comparison.insert(name.clone(), entry);
    }
    (comparison, unscored)
}

/// Runs a [`QualityScorer`] over batches and source pairs.
#[derive(Debug, Clone)]
pub struct BatchAggregator {
    scorer: Arc<QualityScorer>,
    config: BatchConfig,
}

impl BatchAggregator {
    pub fn new(scorer: Arc<QualityScorer>) -> Self {
        Self {
            scorer,
            config: BatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    /// Score every case and reduce per metric. Result order follows `cases`.
    #[instrument(skip_all, fields(cases = cases.len(), max_concurrent = self.config.max_concurrent))]
    pub async fn aggregate(&self, cases: Vec<TestCase>) -> BatchReport {
        let scorer = Arc::clone(&self.scorer);
        let individual_results: Vec<EvaluationResult> = stream::iter(cases)
            .map(|case| {
                let scorer = Arc::clone(&scorer);
                async move { scorer.score_case(case).await }
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let aggregate_scores = aggregate_scores(&individual_results);
        obs::emit_batch_aggregated(individual_results.len(), aggregate_scores.len());

        BatchReport {
            individual_results,
            aggregate_scores,
            timestamp: Utc::now(),
        }
    }

    /// Score a local and a cloud analysis of `input` and compare them.
    #[instrument(skip_all)]
    pub async fn compare_sources(
        &self,
        input: &str,
        local_output: &str,
        cloud_output: &str,
    ) -> ComparisonEvaluation {
        let (local_evaluation, cloud_evaluation) = tokio::join!(
            self.scorer.evaluate_analysis(input, local_output, None),
            self.scorer.evaluate_analysis(input, cloud_output, None),
        );

        let (comparison, unscored) = compare_evaluations(
            &local_evaluation,
            &cloud_evaluation,
            self.config.missing_score,
        );

        ComparisonEvaluation {
            local_evaluation,
            cloud_evaluation,
            comparison,
            unscored,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::MetricResult;

    fn eval(entries: &[(&str, MetricResult)]) -> EvaluationResult {
        EvaluationResult {
            test_case: TestCase::new("in", "out"),
            results: entries
                .iter()
                .map(|(n, r)| (n.to_string(), r.clone()))
                .collect(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_aggregate_excludes_failures_from_count() {
        let results = vec![
            eval(&[("relevance", MetricResult::scored(0.9, 0.7, None))]),
            eval(&[("relevance", MetricResult::failed("boom"))]),
            eval(&[("relevance", MetricResult::scored(0.5, 0.7, None))]),
        ];
        let stats = &aggregate_scores(&results)["relevance"];
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 0.7).abs() < 1e-9);
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 0.9);
    }

    #[test]
    fn test_metric_without_scores_is_omitted() {
        let results = vec![
            eval(&[("faithfulness", MetricResult::failed("a"))]),
            eval(&[("faithfulness", MetricResult::failed("b"))]),
        ];
        assert!(aggregate_scores(&results).is_empty());
        assert!(aggregate_scores(&[]).is_empty());
    }

    #[test]
    fn test_comparison_entry_tie_goes_to_local() {
        let entry = ComparisonEntry::new(0.8, 0.8);
        assert_eq!(entry.difference, 0.0);
        assert_eq!(entry.better, SourceId::Local);

        let entry = ComparisonEntry::new(0.4, 0.9);
        assert!((entry.difference - 0.5).abs() < 1e-9);
        assert_eq!(entry.better, SourceId::Cloud);

        assert_eq!(ComparisonEntry::new(0.9, 0.4).better, SourceId::Local);
    }

    #[test]
    fn test_exclude_policy_lists_unscored_metrics() {
        let local = eval(&[
            ("relevance", MetricResult::scored(0.9, 0.7, None)),
            ("faithfulness", MetricResult::failed("judge down")),
        ]);
        let cloud = eval(&[
            ("relevance", MetricResult::scored(0.6, 0.7, None)),
            ("faithfulness", MetricResult::scored(0.8, 0.7, None)),
        ]);

        let (table, unscored) = compare_evaluations(&local, &cloud, MissingScorePolicy::Exclude);
        assert_eq!(table.len(), 1);
        assert_eq!(table["relevance"].better, SourceId::Local);
        assert_eq!(unscored, vec!["faithfulness".to_string()]);
    }

    #[test]
    fn test_treat_as_zero_policy_reports_missing_side_as_zero() {
        let local = eval(&[("faithfulness", MetricResult::failed("judge down"))]);
        let cloud = eval(&[("faithfulness", MetricResult::scored(0.8, 0.7, None))]);

        let (table, unscored) =
            compare_evaluations(&local, &cloud, MissingScorePolicy::TreatAsZero);
        assert!(unscored.is_empty());
        let entry = &table["faithfulness"];
        assert_eq!(entry.local_score, 0.0);
        assert_eq!(entry.cloud_score, 0.8);
        assert_eq!(entry.better, SourceId::Cloud);
    }

    #[test]
    fn test_batch_config_defaults() {
        let config: BatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.missing_score, MissingScorePolicy::Exclude);
    }
}
