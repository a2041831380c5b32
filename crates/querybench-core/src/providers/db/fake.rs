use super::QueryBackend;
use crate::model::EnvironmentSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted outcome for one SQL text.
#[derive(Debug, Clone, Default)]
pub struct FakeReply {
    pub latency: Duration,
    pub rows: u64,
    pub error: Option<String>,
    /// Fail only every n-th call of this SQL (1-based); `None` fails always when `error` is set.
    pub fail_every: Option<usize>,
    /// Per-call latencies, cycled by call number; overrides `latency` when non-empty.
    pub latencies: Vec<Duration>,
}

impl FakeReply {
    pub fn rows(rows: u64) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_latencies(mut self, latencies: Vec<Duration>) -> Self {
        self.latencies = latencies;
        self
    }

    fn latency_for(&self, call_no: usize) -> Duration {
        if self.latencies.is_empty() {
            return self.latency;
        }
        self.latencies[(call_no - 1) % self.latencies.len()]
    }

    pub fn failing_every(mut self, n: usize, msg: impl Into<String>) -> Self {
        self.fail_every = Some(n.max(1));
        self.error = Some(msg.into());
        self
    }
}

/// In-process backend with scripted replies. Tracks peak concurrency so tests
/// can check the admission gate.
#[derive(Debug, Default)]
pub struct FakeBackend {
    default_reply: FakeReply,
    replies: HashMap<String, FakeReply>,
    seen: std::sync::Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new(default_reply: FakeReply) -> Self {
        Self {
            default_reply,
            ..Default::default()
        }
    }

    pub fn with_reply(mut self, sql: impl Into<String>, reply: FakeReply) -> Self {
        self.replies.insert(sql.into(), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_call_no(&self, sql: &str) -> usize {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        let n = seen.entry(sql.to_string()).or_insert(0);
        *n += 1;
        *n
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryBackend for FakeBackend {
    async fn row_count(&self, sql: &str) -> anyhow::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let reply = self.replies.get(sql).unwrap_or(&self.default_reply).clone();
        let call_no = self.next_call_no(sql);

        let latency = reply.latency_for(call_no);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        match (&reply.error, reply.fail_every) {
            (Some(msg), None) => Err(anyhow::anyhow!("{}", msg)),
            (Some(msg), Some(n)) if call_no % n == 0 => Err(anyhow::anyhow!("{}", msg)),
            _ => Ok(reply.rows),
        }
    }

    async fn snapshot(&self) -> anyhow::Result<EnvironmentSnapshot> {
        Ok(EnvironmentSnapshot {
            backend: "fake".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            details: Default::default(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
