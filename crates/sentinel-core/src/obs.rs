//! Structured observability hooks for pipeline events.
//!
//! Each emitter logs one event with a stable `event` name so that JSON log
//! output (`--json`) can be filtered without parsing messages. Failures are
//! emitted at `warn!`, everything else at `info!`.

use tracing::{info, warn};

use crate::domain::{Severity, SourceId};

/// Emit event: one backend produced a structured result.
pub fn emit_extraction_finished(source: SourceId, backend: &str, severity: Severity) {
    info!(
        event = "extraction.finished",
        source = %source,
        backend = %backend,
        severity = %severity,
    );
}

/// Emit event: one backend's extraction failed.
pub fn emit_extraction_failed(source: SourceId, backend: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "extraction.failed",
        source = %source,
        backend = %backend,
        error = %error,
    );
}

/// Emit event: the agreement judgment completed.
pub fn emit_comparison_finished(judge: &str, agreement_score: f64) {
    info!(
        event = "comparison.finished",
        judge = %judge,
        agreement_score = agreement_score,
    );
}

/// Emit event: the agreement judgment failed.
pub fn emit_comparison_failed(judge: &str, error: &dyn std::fmt::Display) {
    warn!(event = "comparison.failed", judge = %judge, error = %error);
}

/// Emit event: a metric scored a test case.
pub fn emit_metric_scored(metric: &str, score: f64, threshold: f64, passed: bool) {
    info!(
        event = "metric.scored",
        metric = %metric,
        score = score,
        threshold = threshold,
        passed = passed,
    );
}

/// Emit event: a metric failed to score a test case (isolated, not propagated).
pub fn emit_metric_failed(metric: &str, error: &dyn std::fmt::Display) {
    warn!(event = "metric.failed", metric = %metric, error = %error);
}

/// Emit event: a batch was scored and reduced.
pub fn emit_batch_aggregated(cases: usize, metrics_reported: usize) {
    info!(
        event = "batch.aggregated",
        cases = cases,
        metrics_reported = metrics_reported,
    );
}
