use crate::classify::{analyze_complexity, extract_tables};
use crate::model::{Execution, QueryResult, QuerySpec};
use crate::stats::DurationStats;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub const MAX_ERROR_DETAILS: usize = 10;

/// Running aggregate for one query while its executions are still in flight.
///
/// Only [`QueryAccumulator::finish`] produces percentiles, so a partially
/// merged result can never be read as a final one.
#[derive(Debug, Clone)]
pub struct QueryAccumulator {
    spec: QuerySpec,
    executions: Vec<Execution>,
    successful: usize,
    errors: usize,
    error_details: Vec<String>,
    total_duration: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
    rows: u64,
    first_at: Option<DateTime<Utc>>,
    last_at: Option<DateTime<Utc>>,
}

impl QueryAccumulator {
    pub fn new(spec: QuerySpec, expected: usize) -> Self {
        Self {
            spec,
            executions: Vec::with_capacity(expected),
            successful: 0,
            errors: 0,
            error_details: Vec::new(),
            total_duration: Duration::ZERO,
            min: None,
            max: None,
            rows: 0,
            first_at: None,
            last_at: None,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn recorded(&self) -> usize {
        self.executions.len()
    }

    /// Merge step. Callers serialize access per query.
    pub fn record(&mut self, execution: Execution) {
        let at = execution.start_time;
        self.first_at = Some(self.first_at.map_or(at, |f| f.min(at)));
        self.last_at = Some(self.last_at.map_or(at, |l| l.max(at)));

        match &execution.error {
            Some(msg) => {
                self.errors += 1;
                if self.error_details.len() < MAX_ERROR_DETAILS {
                    self.error_details.push(msg.clone());
                }
            }
            None => {
                let d = execution.duration;
                self.successful += 1;
                self.total_duration += d;
                self.rows += execution.row_count;
                self.min = Some(self.min.map_or(d, |m| m.min(d)));
                self.max = Some(self.max.map_or(d, |m| m.max(d)));
            }
        }

        self.executions.push(execution);
    }

    pub fn finish(self) -> QueryResult {
        let mut durations: Vec<Duration> = self
            .executions
            .iter()
            .filter(|e| e.is_success())
            .map(|e| e.duration)
            .collect();
        durations.sort_unstable();

        let stats = (!durations.is_empty()).then(|| DurationStats::from_sorted(&durations));
        let avg = mean_duration(self.total_duration, self.successful);

        QueryResult {
            query_complexity: analyze_complexity(&self.spec.sql),
            tables: extract_tables(&self.spec.sql),
            name: self.spec.name,
            description: self.spec.description,
            sql: self.spec.sql,
            weight: self.spec.weight,
            executions: self.executions,
            successful_executions: self.successful,
            errors: self.errors,
            error_details: self.error_details,
            total_duration: self.total_duration,
            avg_duration: avg,
            min_duration: self.min,
            max_duration: self.max,
            median_duration: stats.map(|s| s.median),
            std_dev_duration: stats.map(|s| s.std_dev),
            percentile95: stats.map(|s| s.p95),
            percentile99: stats.map(|s| s.p99),
            rows_affected: self.rows,
            first_executed_at: self.first_at,
            last_executed_at: self.last_at,
        }
    }
}

/// Exact nanosecond mean; `None` for an empty set. Counts beyond `u32::MAX`
/// are fine here, unlike `Duration / u32`.
fn mean_duration(total: Duration, count: usize) -> Option<Duration> {
    if count == 0 {
        return None;
    }
    let nanos = total.as_nanos() / count as u128;
    Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
}
