use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::aggregate::{BatchReport, ComparisonEvaluation};
use crate::scoring::MetricResult;

/// Write any report as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a markdown summary of a batch run.
pub fn render_batch_md(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str("# Batch Evaluation\n\n");
    out.push_str(&format!("- cases: {}\n\n", report.individual_results.len()));

    out.push_str("## Aggregate Scores\n");
    if report.aggregate_scores.is_empty() {
        out.push_str("- no metric produced a score\n");
    } else {
        out.push_str("| metric | mean | min | max | count |\n");
        out.push_str("|---|---|---|---|---|\n");
        for (name, stats) in &report.aggregate_scores {
            out.push_str(&format!(
                "| {} | {:.3} | {:.3} | {:.3} | {} |\n",
                name, stats.mean, stats.min, stats.max, stats.count
            ));
        }
    }

    let failures: Vec<(usize, &str, &str)> = report
        .individual_results
        .iter()
        .enumerate()
        .flat_map(|(i, eval)| {
            eval.results
                .iter()
                .filter_map(move |(name, r)| r.error().map(|e| (i, name.as_str(), e)))
        })
        .collect();
    if !failures.is_empty() {
        out.push_str("\n## Metric Failures\n");
        for (i, name, error) in failures {
            out.push_str(&format!("- case {}: `{}`: {}\n", i, name, error));
        }
    }
    out
}

/// Render a markdown table comparing local and cloud scores.
pub fn render_comparison_md(evaluation: &ComparisonEvaluation) -> String {
    let mut out = String::new();
    out.push_str("# Local vs Cloud\n\n");
    out.push_str("| metric | local | cloud | difference | better |\n");
    out.push_str("|---|---|---|---|---|\n");
    for (name, entry) in &evaluation.comparison {
        out.push_str(&format!(
            "| {} | {:.3} | {:.3} | {:+.3} | {} |\n",
            name, entry.local_score, entry.cloud_score, entry.difference, entry.better
        ));
    }
    if !evaluation.unscored.is_empty() {
        out.push_str("\n## Unscored\n");
        for name in &evaluation.unscored {
            let reason = evaluation
                .local_evaluation
                .results
                .get(name)
                .and_then(MetricResult::error)
                .or_else(|| {
                    evaluation
                        .cloud_evaluation
                        .results
                        .get(name)
                        .and_then(MetricResult::error)
                })
                .unwrap_or("missing");
            out.push_str(&format!("- `{}`: {}\n", name, reason));
        }
    }
    out
}

/// Write a batch markdown summary.
pub fn write_batch_md(path: &Path, report: &BatchReport) -> Result<()> {
    let md = render_batch_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
