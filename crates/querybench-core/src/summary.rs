use crate::classify::classify_error;
use crate::model::{as_ms, QueryResult, RunSummary};
use crate::stats::DurationStats;
use std::time::Duration;

/// Reduces finalized query results into one run summary.
///
/// Latency figures come from the per-query averages; a query whose average is
/// undefined (no successful execution) is left out of them rather than counted
/// as zero. `max_duration_ms` is the slowest single successful execution.
pub fn summarize(results: &[QueryResult]) -> RunSummary {
    let mut s = RunSummary {
        total_queries: results.len(),
        ..Default::default()
    };

    let mut averages: Vec<Duration> = Vec::with_capacity(results.len());
    let mut slowest: Option<Duration> = None;

    for r in results {
        s.total_executions += r.total_executions();
        s.successful_executions += r.successful_executions;
        s.failed_executions += r.errors;
        s.total_rows_returned += r.rows_affected;

        if r.errors == 0 {
            s.successful_queries += 1;
        } else {
            s.failed_queries += 1;
        }

        if let Some(avg) = r.avg_duration {
            averages.push(avg);
        }
        if let Some(max) = r.max_duration {
            slowest = Some(slowest.map_or(max, |m| m.max(max)));
        }

        *s.queries_by_complexity
            .entry(r.query_complexity.to_string())
            .or_insert(0) += 1;

        // every failed execution, not just the capped detail list
        for msg in r.executions.iter().filter_map(|e| e.error.as_deref()) {
            *s.errors_by_type
                .entry(classify_error(msg).label().to_string())
                .or_insert(0) += 1;
        }
    }

    if !averages.is_empty() {
        let stats = DurationStats::from_durations(&averages);
        s.avg_duration_ms = Some(as_ms(stats.mean));
        s.median_duration_ms = Some(as_ms(stats.median));
        s.std_dev_duration_ms = Some(as_ms(stats.std_dev));
        s.p95_duration_ms = Some(as_ms(stats.p95));
        s.p99_duration_ms = Some(as_ms(stats.p99));
    }
    s.max_duration_ms = slowest.map(as_ms);

    s
}
