//! LLM-as-judge metric adapter.
//!
//! Sends the test case to a judge backend together with a one-line rubric
//! and records the judge's score. The rubric names what to assess; how the
//! judge arrives at a number is the judge's concern.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::metric::{
    Measurement, MetricScorer, ANSWER_RELEVANCY, FAITHFULNESS, HALLUCINATION, RELEVANCE,
};
use crate::backend::{
    number_field, optional_text_field, FieldKind, FieldMap, ModelBackend, TaskSpec,
};
use crate::domain::{MetricError, TestCase};

fn rubric(metric: &str) -> &'static str {
    match metric {
        RELEVANCE => "Rate how relevant the analysis is to the log it analyses.",
        HALLUCINATION => {
            "Rate how free the analysis is of claims unsupported by the log and context \
             (1.0 means nothing is invented)."
        }
        ANSWER_RELEVANCY => {
            "Rate how directly the analysis answers the task of classifying the log."
        }
        FAITHFULNESS => "Rate how faithful the analysis is to the facts stated in the log.",
        _ => "Rate the overall quality of the analysis.",
    }
}

/// A [`MetricScorer`] whose score comes from a judge model.
pub struct JudgeMetric {
    metric: String,
    judge: Arc<dyn ModelBackend>,
    task: TaskSpec,
}

impl std::fmt::Debug for JudgeMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeMetric")
            .field("metric", &self.metric)
            .field("judge", &self.judge.name())
            .finish()
    }
}

impl JudgeMetric {
    pub fn new(metric: &str, rubric: &str, judge: Arc<dyn ModelBackend>) -> Self {
        let task = TaskSpec::new(
            format!("metric_{metric}"),
            format!("{rubric} Score from 0.0 (worst) to 1.0 (best) and explain briefly."),
        )
        .input("input", "The installation log that was analysed")
        .input("actual_output", "The analysis under evaluation")
        .input("expected_output", "Reference answer, if any")
        .input("context", "Background context, if any")
        .output("score", "Score between 0.0 and 1.0", FieldKind::Number)
        .output("reason", "One or two sentences justifying the score", FieldKind::Text);

        Self {
            metric: metric.to_string(),
            judge,
            task,
        }
    }

    /// Judge metric with the built-in rubric for one of the standard metrics.
    pub fn for_metric(metric: &str, judge: Arc<dyn ModelBackend>) -> Self {
        Self::new(metric, rubric(metric), judge)
    }

    pub fn task(&self) -> &TaskSpec {
        &self.task
    }
}

#[async_trait]
impl MetricScorer for JudgeMetric {
    async fn measure(&self, case: &TestCase) -> Result<Measurement, MetricError> {
        if case.actual_output.trim().is_empty() {
            return Err(MetricError::MissingInput {
                field: "actual_output".to_string(),
            });
        }

        let mut inputs = FieldMap::new();
        inputs.insert("input".to_string(), Value::String(case.input.clone()));
        inputs.insert(
            "actual_output".to_string(),
            Value::String(case.actual_output.clone()),
        );
        inputs.insert(
            "expected_output".to_string(),
            case.expected_output.clone().map_or(Value::Null, Value::String),
        );
        inputs.insert(
            "context".to_string(),
            case.context.clone().map_or(Value::Null, Value::String),
        );

        let fields = self.judge.invoke(&self.task, &inputs).await?;
        let score = number_field(&fields, "score")?;
        if !(0.0..=1.0).contains(&score) {
            return Err(MetricError::InvalidScore {
                score,
                reason: "judge score must be within [0, 1]".to_string(),
            });
        }

        Ok(Measurement {
            score,
            reason: optional_text_field(&fields, "reason"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendError;
    use crate::fakes::ScriptedBackend;
    use serde_json::json;

    fn case() -> TestCase {
        TestCase::new("Error: Failed to install package", "Severity: ERROR")
            .with_expected("ERROR")
    }

    #[tokio::test]
    async fn test_judge_score_and_reason_recorded() {
        let judge = Arc::new(ScriptedBackend::new("judge").on_task(
            "metric_relevance",
            json!({"score": 0.85, "reason": "Addresses the install failure"}),
        ));
        let metric = JudgeMetric::for_metric(RELEVANCE, judge.clone());

        let m = metric.measure(&case()).await.unwrap();
        assert_eq!(m.score, 0.85);
        assert_eq!(m.reason.as_deref(), Some("Addresses the install failure"));

        let call = &judge.calls()[0];
        assert_eq!(call.inputs["expected_output"], json!("ERROR"));
        assert_eq!(call.inputs["context"], Value::Null);
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_metric_failure() {
        let judge = Arc::new(
            ScriptedBackend::new("judge").on_task("metric_faithfulness", json!({"score": 7})),
        );
        let err = JudgeMetric::for_metric(FAITHFULNESS, judge)
            .measure(&case())
            .await
            .unwrap_err();
        assert!(matches!(err, MetricError::InvalidScore { score, .. } if score == 7.0));
    }

    #[tokio::test]
    async fn test_backend_error_propagates_as_metric_error() {
        let judge = Arc::new(ScriptedBackend::new("judge").fail_task(
            "metric_hallucination",
            BackendError::Transport("timeout".to_string()),
        ));
        let err = JudgeMetric::for_metric(HALLUCINATION, judge)
            .measure(&case())
            .await
            .unwrap_err();
        assert!(matches!(err, MetricError::Backend(_)));
    }

    #[tokio::test]
    async fn test_empty_output_rejected_before_judging() {
        let judge = Arc::new(ScriptedBackend::new("judge"));
        let err = JudgeMetric::for_metric(ANSWER_RELEVANCY, judge.clone())
            .measure(&TestCase::new("log", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, MetricError::MissingInput { .. }));
        assert!(judge.calls().is_empty());
    }
}
