//! Sentinel CLI
//!
//! The `sentinel` command analyses installation logs with a local and a cloud
//! model and scores the resulting analyses.
//!
//! ## Commands
//!
//! - `analyze`: Structured analysis from both backends plus an agreement judgment
//! - `evaluate`: Quality metrics for one analysis
//! - `evaluate-dual`: Quality metrics for a local and a cloud analysis, compared
//! - `batch`: Quality metrics over a file of test cases, aggregated per metric

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use sentinel_core::metrics::METRICS;
use sentinel_core::report::{render_batch_md, write_batch_md, write_json};
use sentinel_core::{
    AgreementComparator, BatchAggregator, BatchReport, ComparisonEvaluation, DualResult,
    DualRunner, EvaluationResult, FailurePolicy, MissingScorePolicy, ModelBackend, QualityScorer,
    TestCase,
};
use sentinel_llm::{BackendConfig, OpenAiCompatBackend};

use crate::config::SentinelConfig;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dual-model installation log analysis and quality scoring", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local model name (overrides config)
    #[arg(long, global = true, env = "SENTINEL_LOCAL_MODEL")]
    local_model: Option<String>,

    /// Cloud model name (overrides config)
    #[arg(long, global = true, env = "SENTINEL_CLOUD_MODEL")]
    cloud_model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a log snippet with the local and cloud models
    Analyze {
        /// Read the log snippet from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Log snippet given inline (stdin is read when neither is set)
        #[arg(short, long)]
        text: Option<String>,

        /// Only run the local model
        #[arg(long)]
        local_only: bool,

        /// Skip the agreement judgment
        #[arg(long)]
        no_compare: bool,

        /// Fail on the first extraction or comparison error
        #[arg(long)]
        fail_fast: bool,
    },

    /// Score one analysis of a log snippet
    Evaluate {
        /// The log snippet that was analysed
        #[arg(short, long)]
        input: String,

        /// The analysis to score
        #[arg(short, long)]
        analysis: String,

        /// Expected severity, used as the reference output
        #[arg(long)]
        expected_severity: Option<String>,
    },

    /// Score a local and a cloud analysis and compare them
    EvaluateDual {
        /// The log snippet that was analysed
        #[arg(short, long)]
        input: String,

        /// Analysis from the local model
        #[arg(long)]
        local: String,

        /// Analysis from the cloud model
        #[arg(long)]
        cloud: String,

        /// Report a metric missing on one side as 0.0 instead of leaving it out
        #[arg(long)]
        treat_missing_as_zero: bool,
    },

    /// Score a JSON array of test cases and aggregate per metric
    Batch {
        /// JSON file holding an array of test cases
        #[arg(long)]
        cases: PathBuf,

        /// Maximum number of cases scored concurrently
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Print a markdown summary instead of JSON
        #[arg(long)]
        markdown: bool,

        /// Also write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    sentinel_core::telemetry::init_tracing(cli.json, level);

    // Flush counters on every exit path, including early errors.
    let outcome = run(cli).await;
    METRICS.flush();
    outcome
}

async fn run(cli: Cli) -> Result<()> {
    let config = SentinelConfig::load(cli.config.as_deref())?
        .with_model_overrides(cli.local_model, cli.cloud_model);

    match cli.command {
        Commands::Analyze {
            file,
            text,
            local_only,
            no_compare,
            fail_fast,
        } => {
            let snippet = read_snippet(file.as_deref(), text)?;
            let local = build_backend(config.local_backend(), "local", true)?;
            // The cloud backend is never called in local-only mode.
            let cloud = build_backend(config.cloud_backend(), "cloud", !local_only)?;
            let judge = match config.judge_backend() {
                Some(judge) if !local_only && !no_compare => {
                    Some(build_backend(judge, "judge", true)?)
                }
                _ => None,
            };
            let mut runner_config = config.runner.clone();
            if fail_fast {
                runner_config.failure_policy = FailurePolicy::FailFast;
            }
            let runner = build_runner(local, cloud, judge).with_config(runner_config);
            let result = cmd_analyze(&runner, &snippet, !local_only, !no_compare).await?;
            print_json(&result)
        }
        Commands::Evaluate {
            input,
            analysis,
            expected_severity,
        } => {
            let scorer = QualityScorer::standard(metric_judge(&config)?, &config.thresholds);
            let result =
                cmd_evaluate(&scorer, &input, &analysis, expected_severity.as_deref()).await;
            print_json(&result)
        }
        Commands::EvaluateDual {
            input,
            local,
            cloud,
            treat_missing_as_zero,
        } => {
            let scorer = QualityScorer::standard(metric_judge(&config)?, &config.thresholds);
            let mut batch_config = config.batch.clone();
            if treat_missing_as_zero {
                batch_config.missing_score = MissingScorePolicy::TreatAsZero;
            }
            let aggregator = BatchAggregator::new(Arc::new(scorer)).with_config(batch_config);
            let result = cmd_evaluate_dual(&aggregator, &input, &local, &cloud).await;
            print_json(&result)
        }
        Commands::Batch {
            cases,
            max_concurrent,
            markdown,
            output,
        } => {
            let scorer = QualityScorer::standard(metric_judge(&config)?, &config.thresholds);
            let mut batch_config = config.batch.clone();
            if let Some(n) = max_concurrent {
                batch_config.max_concurrent = n;
            }
            let aggregator = BatchAggregator::new(Arc::new(scorer)).with_config(batch_config);
            let report = cmd_batch(&aggregator, &cases).await?;
            if let Some(path) = &output {
                if markdown {
                    write_batch_md(path, &report)?;
                } else {
                    write_json(path, &report)?;
                }
                info!(path = ?path, "batch report written");
            }
            if markdown {
                print!("{}", render_batch_md(&report));
                Ok(())
            } else {
                print_json(&report)
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serialize output")?
    );
    Ok(())
}

/// Log snippet from `--file`, `--text`, or stdin, in that order.
fn read_snippet(file: Option<&Path>, text: Option<String>) -> Result<String> {
    let snippet = match (file, text) {
        (Some(path), _) => {
            std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?
        }
        (None, Some(text)) => text,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read log snippet from stdin")?;
            buf
        }
    };
    if snippet.trim().is_empty() {
        anyhow::bail!("log snippet is empty");
    }
    Ok(snippet)
}

fn build_backend(
    config: BackendConfig,
    role: &str,
    require_key: bool,
) -> Result<Arc<dyn ModelBackend>> {
    let model = config.model.clone();
    let backend = if require_key {
        OpenAiCompatBackend::new(config)
    } else {
        OpenAiCompatBackend::with_resolved_key(config, None)
    }
    .with_context(|| format!("configure {role} backend"))?;
    Ok(Arc::new(backend.with_name(&format!("{role}/{model}"))))
}

/// Judge for quality metrics: `[judge]` when configured, else the cloud backend.
fn metric_judge(config: &SentinelConfig) -> Result<Arc<dyn ModelBackend>> {
    match config.judge_backend() {
        Some(judge) => build_backend(judge, "judge", true),
        None => build_backend(config.cloud_backend(), "cloud", true),
    }
}

fn build_runner(
    local: Arc<dyn ModelBackend>,
    cloud: Arc<dyn ModelBackend>,
    judge: Option<Arc<dyn ModelBackend>>,
) -> DualRunner {
    let runner = DualRunner::new(local, cloud);
    match judge {
        Some(judge) => runner.with_comparator(AgreementComparator::new(judge)),
        None => runner,
    }
}

async fn cmd_analyze(
    runner: &DualRunner,
    snippet: &str,
    use_both: bool,
    compare: bool,
) -> Result<DualResult> {
    let result = runner
        .run(snippet, use_both, compare)
        .await
        .context("dual analysis failed")?;
    Ok(result)
}

async fn cmd_evaluate(
    scorer: &QualityScorer,
    input: &str,
    analysis: &str,
    expected_severity: Option<&str>,
) -> EvaluationResult {
    scorer
        .evaluate_analysis(input, analysis, expected_severity)
        .await
}

async fn cmd_evaluate_dual(
    aggregator: &BatchAggregator,
    input: &str,
    local: &str,
    cloud: &str,
) -> ComparisonEvaluation {
    aggregator.compare_sources(input, local, cloud).await
}

async fn cmd_batch(aggregator: &BatchAggregator, cases_path: &Path) -> Result<BatchReport> {
    let raw = std::fs::read_to_string(cases_path)
        .with_context(|| format!("read cases {:?}", cases_path))?;
    let cases: Vec<TestCase> =
        serde_json::from_str(&raw).with_context(|| format!("parse cases {:?}", cases_path))?;
    info!(cases = cases.len(), "scoring batch");
    Ok(aggregator.aggregate(cases).await)
}
