use super::{format_duration, slowest};
use crate::model::{ComparisonResult, RunResult};
use std::fmt::Write;

const TOP: usize = 5;

pub fn print_summary(run: &RunResult) {
    eprint!("{}", render_summary(run));
}

pub fn print_comparison(cmp: &ComparisonResult) {
    eprint!("{}", render_comparison(cmp));
}

fn ms(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2} ms", v))
        .unwrap_or_else(|| "n/a".into())
}

pub fn render_summary(run: &RunResult) -> String {
    let s = &run.summary;
    let mut out = String::new();

    let _ = writeln!(out, "\n====== PERFORMANCE SUMMARY ======");
    let _ = writeln!(out, "Label: {}", run.label);
    let _ = writeln!(out, "Total duration: {}", format_duration(run.total_duration));
    let _ = writeln!(
        out,
        "Queries: {} total, {} successful, {} with errors",
        s.total_queries, s.successful_queries, s.failed_queries
    );
    let _ = writeln!(
        out,
        "Executions: {} total, {} failed",
        s.total_executions, s.failed_executions
    );
    let _ = writeln!(out, "Average query time: {}", ms(s.avg_duration_ms));
    let _ = writeln!(out, "Median query time: {}", ms(s.median_duration_ms));
    let _ = writeln!(out, "P95 query time: {}", ms(s.p95_duration_ms));
    let _ = writeln!(out, "Max query time: {}", ms(s.max_duration_ms));
    let _ = writeln!(out, "Total rows returned: {}", s.total_rows_returned);

    let _ = writeln!(out, "\nComplexity distribution:");
    for (tier, count) in &s.queries_by_complexity {
        let share = if s.total_queries > 0 {
            *count as f64 / s.total_queries as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} queries ({:.1}%)", tier, count, share);
    }

    let _ = writeln!(out, "\nTop {} slowest queries:", TOP);
    for (i, q) in slowest(&run.query_results, TOP).into_iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}: {} avg, {} rows, {} complexity",
            i + 1,
            q.name,
            ms(q.avg_ms()),
            q.rows_affected,
            q.query_complexity
        );
    }

    let _ = writeln!(out, "\nTop {} queries with errors:", TOP);
    let mut failing: Vec<_> = run.query_results.iter().filter(|q| q.errors > 0).collect();
    failing.sort_by(|a, b| b.errors.cmp(&a.errors));
    if failing.is_empty() {
        let _ = writeln!(out, "  No queries with errors");
    }
    for (i, q) in failing.into_iter().take(TOP).enumerate() {
        let _ = writeln!(out, "  {}. {}: {} errors", i + 1, q.name, q.errors);
        if let Some(first) = q.error_details.first() {
            let _ = writeln!(out, "     First error: {}", first);
        }
    }

    if !s.errors_by_type.is_empty() {
        let _ = writeln!(out, "\nErrors by type:");
        for (label, count) in &s.errors_by_type {
            let _ = writeln!(out, "  {}: {}", label, count);
        }
    }

    let env = &run.environment;
    let _ = writeln!(out, "\nDatabase:");
    let _ = writeln!(out, "  Backend: {}", env.backend);
    let _ = writeln!(
        out,
        "  Version: {}",
        env.version.as_deref().unwrap_or("unknown")
    );
    for (k, v) in &env.details {
        let _ = writeln!(out, "  {}: {}", k, v);
    }
    let _ = writeln!(out, "=================================");
    out
}

pub fn render_comparison(cmp: &ComparisonResult) -> String {
    let s = &cmp.improvement_summary;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n====== COMPARISON: {} vs {} ======",
        cmp.before.label, cmp.after.label
    );
    let _ = writeln!(out, "Average time improvement: {:.2}%", s.avg_time_improvement);
    let _ = writeln!(out, "Median time improvement: {:.2}%", s.median_time_improvement);
    let _ = writeln!(out, "P95 time improvement: {:.2}%", s.p95_time_improvement);
    let _ = writeln!(out, "Max time improvement: {:.2}%", s.max_time_improvement);
    let _ = writeln!(out, "Error reduction: {:.2}%", s.error_reduction);
    let _ = writeln!(
        out,
        "Success rate change: {:+.2} pts",
        s.success_rate_improvement
    );

    let _ = writeln!(out, "\nPer query (best first):");
    for q in &cmp.query_comparisons {
        let _ = writeln!(
            out,
            "  {:<30} {:>12} -> {:<12} {:+.2}%  errors {} -> {}",
            q.name,
            ms(q.before_avg_ms),
            ms(q.after_avg_ms),
            q.improvement_percent,
            q.before_errors,
            q.after_errors
        );
    }

    let changed: Vec<_> = cmp.errors_reduced.iter().filter(|(_, d)| **d != 0).collect();
    if !changed.is_empty() {
        let _ = writeln!(out, "\nErrors reduced by type:");
        for (label, delta) in changed {
            let _ = writeln!(out, "  {}: {}", label, delta);
        }
    }
    let _ = writeln!(out, "=================================");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::config::RunConfig;
    use crate::engine::QueryAccumulator;
    use crate::model::{EnvironmentSnapshot, Execution, QuerySpec};
    use crate::summary::summarize;
    use chrono::Utc;
    use std::time::Duration;

    fn run(label: &str, ms: u64, fail: bool) -> RunResult {
        let mut acc = QueryAccumulator::new(
            QuerySpec {
                name: "lookup".into(),
                sql: "SELECT 1".into(),
                ..Default::default()
            },
            2,
        );
        acc.record(Execution::success(Utc::now(), Duration::from_millis(ms), 1));
        if fail {
            acc.record(Execution::failure(Utc::now(), Duration::ZERO, "Deadlock found"));
        }
        let results = vec![acc.finish()];
        RunResult {
            timestamp: Utc::now(),
            label: label.into(),
            config: RunConfig::default(),
            total_duration: Duration::from_millis(250),
            summary: summarize(&results),
            query_results: results,
            environment: EnvironmentSnapshot::unavailable("sqlite"),
        }
    }

    #[test]
    fn test_summary_sections() {
        let out = render_summary(&run("before", 100, true));
        assert!(out.contains("Label: before"));
        assert!(out.contains("Total duration: 250.00 ms"));
        assert!(out.contains("1. lookup: 100.00 ms avg"));
        assert!(out.contains("First error: Deadlock found"));
        assert!(out.contains("Deadlock: 1"));
        assert!(out.contains("Version: unknown"));
    }

    #[test]
    fn test_summary_without_errors() {
        let out = render_summary(&run("clean", 5, false));
        assert!(out.contains("No queries with errors"));
        assert!(!out.contains("Errors by type"));
    }

    #[test]
    fn test_comparison_lines() {
        let cmp = compare(run("before", 100, true), run("after", 80, false));
        let out = render_comparison(&cmp);
        assert!(out.contains("COMPARISON: before vs after"));
        assert!(out.contains("Average time improvement: 20.00%"));
        assert!(out.contains("+20.00%"));
        assert!(out.contains("Deadlock: 1"));
    }
}
