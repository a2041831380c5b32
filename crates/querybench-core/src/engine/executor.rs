use crate::model::Execution;
use crate::providers::db::QueryBackend;
use chrono::Utc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// Runs `sql` once. Never fails: errors and timeouts become a failed
/// [`Execution`] whose duration covers the time spent up to the failure.
pub async fn execute_once(backend: &dyn QueryBackend, sql: &str, limit: Duration) -> Execution {
    let start_time = Utc::now();
    let start = Instant::now();

    let res = timeout(limit, backend.row_count(sql)).await;
    let duration = start.elapsed();

    match res {
        Ok(Ok(rows)) => Execution::success(start_time, duration, rows),
        Ok(Err(e)) => Execution::failure(start_time, duration, format!("{:#}", e)),
        Err(_) => Execution::failure(
            start_time,
            duration,
            format!("query timeout: exceeded {:?}", limit),
        ),
    }
}
