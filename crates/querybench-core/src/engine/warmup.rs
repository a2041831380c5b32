use crate::model::as_ms;
use crate::providers::db::QueryBackend;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

const WARMUP_SQL: &str = "SELECT 1";

/// Primes the backend's connection pool. Failures are logged and counted, never fatal.
///
/// Returns the number of failed warmup statements.
pub async fn warmup(backend: Arc<dyn QueryBackend>, iterations: usize, concurrency: usize) -> usize {
    if iterations == 0 {
        return 0;
    }

    tracing::info!(event = "warmup.start", iterations, concurrency);
    let start = Instant::now();
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let failures = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::with_capacity(iterations);

    for _ in 0..iterations {
        let permit = match sem.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let backend = backend.clone();
        let failures = failures.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = backend.row_count(WARMUP_SQL).await {
                failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(event = "warmup.error", error = %e);
            }
        }));
    }

    for h in handles {
        if let Err(e) = h.await {
            failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(event = "warmup.task_failed", error = %e);
        }
    }

    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        tracing::warn!(event = "warmup.errors", failed, "warmup had errors");
    }
    tracing::info!(
        event = "warmup.finished",
        elapsed_ms = as_ms(start.elapsed()),
        failed
    );
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::db::{FakeBackend, FakeReply};
    use std::time::Duration;

    #[tokio::test]
    async fn test_warmup_respects_concurrency() {
        let fake = Arc::new(FakeBackend::new(
            FakeReply::rows(1).with_latency(Duration::from_millis(5)),
        ));
        let failed = warmup(fake.clone(), 20, 3).await;
        assert_eq!(failed, 0);
        assert_eq!(fake.calls(), 20);
        assert!(fake.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_warmup_errors_are_not_fatal() {
        let fake = Arc::new(FakeBackend::new(FakeReply::error("Connection refused")));
        assert_eq!(warmup(fake.clone(), 4, 2).await, 4);
        assert_eq!(warmup(fake, 0, 2).await, 0);
    }
}
