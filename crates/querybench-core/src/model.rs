use crate::config::RunConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// One labeled query of a benchmark set. Names are unique within a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuerySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sql: String,
    #[serde(default)]
    pub weight: u32,
}

/// A single attempt of one query. `row_count` is only meaningful when `error` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub start_time: DateTime<Utc>,
    #[serde(rename = "durationNs", with = "duration_ns")]
    pub duration: Duration,
    pub row_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Execution {
    pub fn success(start_time: DateTime<Utc>, duration: Duration, row_count: u64) -> Self {
        Self {
            start_time,
            duration,
            row_count,
            error: None,
        }
    }

    pub fn failure(start_time: DateTime<Utc>, duration: Duration, message: impl Into<String>) -> Self {
        Self {
            start_time,
            duration,
            row_count: 0,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Lexical complexity tier of a query, ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Complexity {
    #[default]
    Low,
    LowMedium,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::LowMedium => "low-medium",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate over every execution of one query within a run.
///
/// Duration statistics are `None` whenever no execution succeeded, so "no data"
/// never reads as "zero latency". Use `successful_executions` to tell the two apart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub name: String,
    pub description: String,
    pub sql: String,
    pub weight: u32,
    pub query_complexity: Complexity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executions: Vec<Execution>,
    pub successful_executions: usize,
    pub errors: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<String>,
    #[serde(rename = "totalDurationNs", with = "duration_ns")]
    pub total_duration: Duration,
    #[serde(rename = "avgDurationNs", with = "opt_duration_ns")]
    pub avg_duration: Option<Duration>,
    #[serde(rename = "minDurationNs", with = "opt_duration_ns")]
    pub min_duration: Option<Duration>,
    #[serde(rename = "maxDurationNs", with = "opt_duration_ns")]
    pub max_duration: Option<Duration>,
    #[serde(rename = "medianDurationNs", with = "opt_duration_ns")]
    pub median_duration: Option<Duration>,
    #[serde(rename = "stdDevDurationNs", with = "opt_duration_ns")]
    pub std_dev_duration: Option<Duration>,
    #[serde(rename = "percentile95Ns", with = "opt_duration_ns")]
    pub percentile95: Option<Duration>,
    #[serde(rename = "percentile99Ns", with = "opt_duration_ns")]
    pub percentile99: Option<Duration>,
    pub rows_affected: u64,
    pub first_executed_at: Option<DateTime<Utc>>,
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl QueryResult {
    pub fn avg_ms(&self) -> Option<f64> {
        self.avg_duration.map(as_ms)
    }

    pub fn total_executions(&self) -> usize {
        self.executions.len()
    }
}

/// Reduction over all query results of a run. Durations are in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_queries: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
    pub total_executions: usize,
    pub successful_executions: usize,
    pub failed_executions: usize,
    pub avg_duration_ms: Option<f64>,
    pub median_duration_ms: Option<f64>,
    pub std_dev_duration_ms: Option<f64>,
    pub max_duration_ms: Option<f64>,
    pub p95_duration_ms: Option<f64>,
    pub p99_duration_ms: Option<f64>,
    pub total_rows_returned: u64,
    pub queries_by_complexity: BTreeMap<String, usize>,
    pub errors_by_type: BTreeMap<String, usize>,
}

/// Backend description captured at the start of a run. Opaque to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl EnvironmentSnapshot {
    pub fn unavailable(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            version: None,
            details: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub config: RunConfig,
    #[serde(rename = "totalDurationNs", with = "duration_ns")]
    pub total_duration: Duration,
    pub query_results: Vec<QueryResult>,
    pub environment: EnvironmentSnapshot,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryComparison {
    pub name: String,
    pub before_avg_ms: Option<f64>,
    pub after_avg_ms: Option<f64>,
    pub improvement_percent: f64,
    pub before_errors: usize,
    pub after_errors: usize,
    pub before_rows: u64,
    pub after_rows: u64,
}

/// Percent improvements of `after` over `before`; positive means faster or fewer errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementStats {
    pub avg_time_improvement: f64,
    pub median_time_improvement: f64,
    pub p95_time_improvement: f64,
    pub max_time_improvement: f64,
    pub error_reduction: f64,
    pub success_rate_improvement: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub before: RunResult,
    pub after: RunResult,
    pub improvement_summary: ImprovementStats,
    pub query_comparisons: Vec<QueryComparison>,
    pub errors_reduced: BTreeMap<String, i64>,
}

pub fn as_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

pub(crate) mod duration_ns {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(d)?))
    }
}

pub(crate) mod opt_duration_ns {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_nanos))
    }
}
