//! Quality scorer behaviour: per-metric isolation and the pass invariant.

use std::sync::Arc;

use serde_json::json;

use sentinel_core::fakes::{FailingMetric, FixedMetric, FnMetric, ScriptedBackend};
use sentinel_core::scoring::{ANSWER_RELEVANCY, FAITHFULNESS, HALLUCINATION, RELEVANCE};
use sentinel_core::{
    BackendError, Measurement, MetricError, MetricResult, MetricThresholds, QualityScorer,
    RegisteredMetric, TestCase, INSTALLATION_LOG_CONTEXT,
};

fn metric(
    name: &str,
    threshold: f64,
    scorer: impl sentinel_core::MetricScorer + 'static,
) -> RegisteredMetric {
    RegisteredMetric::new(name, threshold, Arc::new(scorer))
}

#[tokio::test]
async fn failing_metric_does_not_affect_the_others() {
    let scorer = QualityScorer::new(vec![
        metric(RELEVANCE, 0.7, FixedMetric::new(0.9)),
        metric(HALLUCINATION, 0.5, FailingMetric::new("judge unreachable")),
        metric(FAITHFULNESS, 0.7, FixedMetric::new(0.6)),
    ]);

    let eval = scorer
        .score("Error: Failed to install package", "Severity: ERROR", None, None)
        .await;

    assert_eq!(eval.results.len(), 3);
    assert_eq!(eval.score(RELEVANCE), Some(0.9));
    assert_eq!(eval.score(FAITHFULNESS), Some(0.6));
    let hallucination = &eval.results[HALLUCINATION];
    assert!(hallucination.error().unwrap().contains("judge unreachable"));
    assert!(!hallucination.passed());
    assert_eq!(eval.failed_metrics(), vec![HALLUCINATION]);
}

#[tokio::test]
async fn passed_is_score_at_least_threshold() {
    let scorer = QualityScorer::new(vec![
        metric(RELEVANCE, 0.7, FixedMetric::new(0.7)),
        metric(FAITHFULNESS, 0.7, FixedMetric::new(0.69)),
    ]);
    let eval = scorer.score("in", "out", None, None).await;

    for result in eval.results.values() {
        match result {
            MetricResult::Scored {
                score,
                threshold,
                passed,
                ..
            } => assert_eq!(*passed, score >= threshold),
            MetricResult::Failed { .. } => panic!("no metric should fail"),
        }
    }
    assert!(eval.results[RELEVANCE].passed());
    assert!(!eval.results[FAITHFULNESS].passed());
    assert!(!eval.all_passed());
}

#[tokio::test]
async fn non_finite_score_is_recorded_as_failure() {
    let scorer = QualityScorer::new(vec![
        metric(RELEVANCE, 0.7, FixedMetric::new(f64::NAN)),
        metric(FAITHFULNESS, 0.7, FixedMetric::new(1.0)),
    ]);
    let eval = scorer.score("in", "out", None, None).await;
    assert!(eval.results[RELEVANCE].error().is_some());
    assert!(eval.results[FAITHFULNESS].passed());
}

#[tokio::test]
async fn evaluate_analysis_attaches_installation_context() {
    let scorer = QualityScorer::new(vec![metric(
        RELEVANCE,
        0.7,
        FnMetric::new(|case: &TestCase| {
            if case.context.as_deref() != Some(INSTALLATION_LOG_CONTEXT) {
                return Err(MetricError::MissingInput {
                    field: "context".into(),
                });
            }
            let matches = case
                .expected_output
                .as_deref()
                .is_some_and(|e| case.actual_output.contains(e));
            Ok(Measurement::new(if matches { 1.0 } else { 0.0 }))
        }),
    )]);

    let eval = scorer
        .evaluate_analysis(
            "Error: Failed to install package",
            "Severity: ERROR, Category: Dependency",
            Some("ERROR"),
        )
        .await;

    assert_eq!(eval.test_case.expected_output.as_deref(), Some("ERROR"));
    assert_eq!(eval.score(RELEVANCE), Some(1.0));
    assert!(eval.all_passed());
}

#[tokio::test]
async fn standard_scorer_reports_all_four_metrics() {
    // The judge answers two metrics; the other two hit unscripted tasks and fail.
    let judge = Arc::new(
        ScriptedBackend::new("judge")
            .on_task("metric_relevance", json!({"score": 0.8, "reason": "on topic"}))
            .on_task("metric_faithfulness", json!({"score": 0.75}))
            .fail_task(
                "metric_hallucination",
                BackendError::Transport("reset by peer".into()),
            ),
    );
    let scorer = QualityScorer::standard(judge, &MetricThresholds::default());
    assert_eq!(scorer.len(), 4);

    let eval = scorer
        .evaluate_analysis(
            "Error: Failed to install package",
            "Severity: ERROR, Category: Dependency",
            Some("ERROR"),
        )
        .await;

    assert_eq!(eval.results.len(), 4);
    for name in [RELEVANCE, HALLUCINATION, ANSWER_RELEVANCY, FAITHFULNESS] {
        assert!(eval.results.contains_key(name), "missing {name}");
    }
    assert!(eval.results[RELEVANCE].passed());
    assert!(eval.results[FAITHFULNESS].passed());
    assert!(eval.results[HALLUCINATION].error().is_some());
    assert!(eval.results[ANSWER_RELEVANCY].error().is_some());
    assert_eq!(scorer.threshold(HALLUCINATION), Some(0.5));
}

#[tokio::test]
async fn each_metric_is_attempted_once_per_case() {
    let judge = Arc::new(ScriptedBackend::new("judge").on_task(
        "metric_relevance",
        json!({"score": 0.9}),
    ));
    let thresholds = MetricThresholds::default();
    let scorer = QualityScorer::standard(judge.clone(), &thresholds);

    scorer.score("in", "out", None, None).await;

    assert_eq!(judge.calls().len(), 4);
    assert_eq!(judge.calls_for("metric_relevance"), 1);
}
