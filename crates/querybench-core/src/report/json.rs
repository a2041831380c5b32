use super::{output_path, slowest};
use crate::model::{ComparisonResult, EnvironmentSnapshot, RunResult, RunSummary};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

const TOP_QUERIES: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TopQuery<'a> {
    name: &'a str,
    avg_duration_ms: Option<f64>,
    executions: usize,
    errors: usize,
    rows: u64,
    complexity: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryReport<'a> {
    timestamp: DateTime<Utc>,
    label: &'a str,
    total_duration: String,
    summary: &'a RunSummary,
    environment: &'a EnvironmentSnapshot,
    top_queries: Vec<TopQuery<'a>>,
}

fn write_pretty<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create report file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write report: {}", path.display()))
}

/// Full run, including every execution.
pub fn save_json(run: &RunResult, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_path(dir, "performance", &run.label, "json")?;
    write_pretty(run, &path)?;
    tracing::info!(event = "report.saved", kind = "json", path = %path.display());
    Ok(path)
}

/// Summary plus the slowest queries, without per-execution detail.
pub fn save_summary_json(run: &RunResult, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_path(dir, "summary", &run.label, "json")?;
    let report = SummaryReport {
        timestamp: run.timestamp,
        label: &run.label,
        total_duration: super::format_duration(run.total_duration),
        summary: &run.summary,
        environment: &run.environment,
        top_queries: slowest(&run.query_results, TOP_QUERIES)
            .into_iter()
            .map(|q| TopQuery {
                name: &q.name,
                avg_duration_ms: q.avg_ms(),
                executions: q.successful_executions,
                errors: q.errors,
                rows: q.rows_affected,
                complexity: q.query_complexity.to_string(),
            })
            .collect(),
    };
    write_pretty(&report, &path)?;
    tracing::info!(event = "report.saved", kind = "summary", path = %path.display());
    Ok(path)
}

pub fn save_comparison_json(cmp: &ComparisonResult, dir: &Path) -> anyhow::Result<PathBuf> {
    let label = format!(
        "{}-vs-{}",
        super::file_label(&cmp.before.label),
        super::file_label(&cmp.after.label)
    );
    let path = output_path(dir, "comparison", &label, "json")?;
    write_pretty(cmp, &path)?;
    tracing::info!(event = "report.saved", kind = "comparison", path = %path.display());
    Ok(path)
}

/// Reads back a run written by [`save_json`].
pub fn load_run(path: &Path) -> anyhow::Result<RunResult> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read run file: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse run file: {}", path.display()))
}
