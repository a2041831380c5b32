pub mod console;
pub mod csv;
pub mod json;

use crate::model::QueryResult;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

/// Humanized duration with two decimals, picking the largest unit below the value.
pub fn format_duration(d: Duration) -> String {
    let ns = d.as_nanos() as f64;
    if d < Duration::from_micros(1) {
        format!("{:.2} ns", ns)
    } else if d < Duration::from_millis(1) {
        format!("{:.2} µs", ns / 1_000.0)
    } else if d < Duration::from_secs(1) {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else if d < MINUTE {
        format!("{:.2} s", d.as_secs_f64())
    } else {
        format!("{:.2} min", d.as_secs_f64() / 60.0)
    }
}

/// Up to `n` results ordered by average latency, slowest first; undefined averages sort last.
pub fn slowest(results: &[QueryResult], n: usize) -> Vec<&QueryResult> {
    let mut sorted: Vec<&QueryResult> = results.iter().collect();
    sorted.sort_by(|a, b| b.avg_duration.cmp(&a.avg_duration));
    sorted.truncate(n);
    sorted
}

fn ms_cell(d: Option<Duration>) -> String {
    d.map(|d| format!("{:.2}", crate::model::as_ms(d)))
        .unwrap_or_default()
}

fn file_label(label: &str) -> &str {
    if label.trim().is_empty() {
        "test"
    } else {
        label
    }
}

/// `<dir>/<prefix>-<label>-<local timestamp>.<ext>`, creating `dir` if needed.
fn output_path(dir: &Path, prefix: &str, label: &str, ext: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(dir.join(format!("{}-{}-{}.{}", prefix, file_label(label), ts, ext)))
}
