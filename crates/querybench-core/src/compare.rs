use crate::model::{as_ms, ComparisonResult, ImprovementStats, QueryComparison, RunResult, RunSummary};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Relative improvement of `after` over `before` in percent. Zero when there is
/// no positive baseline to divide by.
pub fn improvement_pct(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (before - after) / before * 100.0
    } else {
        0.0
    }
}

fn opt_pct(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (Some(b), Some(a)) => improvement_pct(b, a),
        _ => 0.0,
    }
}

/// Joins two runs by query name (inner join, `before` order) and computes
/// per-query and aggregate improvements.
pub fn compare(before: RunResult, after: RunResult) -> ComparisonResult {
    let after_by_name: HashMap<&str, _> = after
        .query_results
        .iter()
        .map(|q| (q.name.as_str(), q))
        .collect();

    let mut query_comparisons: Vec<QueryComparison> = before
        .query_results
        .iter()
        .filter_map(|b| {
            let a = after_by_name.get(b.name.as_str())?;
            let before_avg_ms = b.avg_ms();
            let after_avg_ms = a.avg_ms();
            Some(QueryComparison {
                name: b.name.clone(),
                before_avg_ms,
                after_avg_ms,
                improvement_percent: opt_pct(before_avg_ms, after_avg_ms),
                before_errors: b.errors,
                after_errors: a.errors,
                before_rows: b.rows_affected,
                after_rows: a.rows_affected,
            })
        })
        .collect();

    // stable, so ties keep `before` order
    query_comparisons.sort_by(|x, y| y.improvement_percent.total_cmp(&x.improvement_percent));

    let improvement_summary = ImprovementStats {
        avg_time_improvement: opt_pct(mean_avg_ms(&before), mean_avg_ms(&after)),
        median_time_improvement: opt_pct(
            before.summary.median_duration_ms,
            after.summary.median_duration_ms,
        ),
        p95_time_improvement: opt_pct(before.summary.p95_duration_ms, after.summary.p95_duration_ms),
        max_time_improvement: opt_pct(before.summary.max_duration_ms, after.summary.max_duration_ms),
        error_reduction: improvement_pct(
            before.summary.failed_executions as f64,
            after.summary.failed_executions as f64,
        ),
        success_rate_improvement: success_rate(&after.summary) - success_rate(&before.summary),
    };

    let errors_reduced = errors_reduced(&before.summary, &after.summary);

    ComparisonResult {
        before,
        after,
        improvement_summary,
        query_comparisons,
        errors_reduced,
    }
}

/// Mean of per-query averages over queries with at least one success.
fn mean_avg_ms(run: &RunResult) -> Option<f64> {
    let avgs: Vec<Duration> = run
        .query_results
        .iter()
        .filter(|q| q.successful_executions > 0)
        .filter_map(|q| q.avg_duration)
        .collect();
    if avgs.is_empty() {
        return None;
    }
    let total: Duration = avgs.iter().sum();
    Some(as_ms(total) / avgs.len() as f64)
}

/// Percentage of successful executions; 0 for an empty run.
fn success_rate(s: &RunSummary) -> f64 {
    if s.total_executions == 0 {
        return 0.0;
    }
    s.successful_executions as f64 / s.total_executions as f64 * 100.0
}

fn errors_reduced(before: &RunSummary, after: &RunSummary) -> BTreeMap<String, i64> {
    let mut out = BTreeMap::new();
    for label in before.errors_by_type.keys().chain(after.errors_by_type.keys()) {
        if out.contains_key(label) {
            continue;
        }
        let b = before.errors_by_type.get(label).copied().unwrap_or(0) as i64;
        let a = after.errors_by_type.get(label).copied().unwrap_or(0) as i64;
        out.insert(label.clone(), b - a);
    }
    out
}
