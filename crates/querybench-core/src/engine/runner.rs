use super::accumulator::QueryAccumulator;
use super::executor::execute_once;
use crate::config::RunConfig;
use crate::model::{as_ms, EnvironmentSnapshot, Execution, QueryResult, QuerySpec, RunResult};
use crate::providers::db::QueryBackend;
use crate::summary::summarize;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub iterations: usize,
    pub concurrency: usize,
    pub timeout: Duration,
    pub verbose: bool,
}

impl From<&RunConfig> for RunSettings {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            iterations: cfg.iterations,
            concurrency: cfg.concurrency,
            timeout: cfg.timeout(),
            verbose: cfg.verbose,
        }
    }
}

/// Drives every query's iterations through one shared admission gate.
///
/// At most `concurrency` executions are in flight across the whole batch.
/// Each query has its own lock, so merges for different queries never contend.
/// The settings are always derived from the config recorded in the result.
pub struct Runner {
    backend: Arc<dyn QueryBackend>,
    config: RunConfig,
    settings: RunSettings,
}

struct Batch {
    acc: Arc<Mutex<QueryAccumulator>>,
    handles: Vec<JoinHandle<()>>,
}

fn lock(acc: &Mutex<QueryAccumulator>) -> MutexGuard<'_, QueryAccumulator> {
    acc.lock().unwrap_or_else(|e| e.into_inner())
}

impl Runner {
    pub fn new(backend: Arc<dyn QueryBackend>, config: RunConfig) -> Self {
        let settings = RunSettings::from(&config);
        Self {
            backend,
            config,
            settings,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Full run: environment snapshot, all queries, summary.
    pub async fn run(&self, queries: &[QuerySpec]) -> anyhow::Result<RunResult> {
        let cfg = &self.config;
        let timestamp = Utc::now();
        let started = Instant::now();

        let environment = match self.backend.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    event = "backend.snapshot_failed",
                    error = %e,
                    "couldn't capture environment snapshot"
                );
                EnvironmentSnapshot::unavailable(self.backend.backend_name())
            }
        };

        tracing::info!(
            event = "run.start",
            label = %cfg.label,
            queries = queries.len(),
            iterations = self.settings.iterations,
            concurrency = self.settings.concurrency
        );

        let query_results = self.run_queries(queries).await?;
        let summary = summarize(&query_results);
        let total_duration = started.elapsed();

        tracing::info!(
            event = "run.finished",
            label = %cfg.label,
            elapsed_ms = as_ms(total_duration),
            failed_executions = summary.failed_executions
        );

        Ok(RunResult {
            timestamp,
            label: cfg.label.clone(),
            config: cfg.clone(),
            total_duration,
            query_results,
            environment,
            summary,
        })
    }

    /// One finalized result per query, in input order. Query failures never
    /// stop the batch; only a closed admission gate is an error.
    pub async fn run_queries(&self, queries: &[QuerySpec]) -> anyhow::Result<Vec<QueryResult>> {
        let iterations = self.settings.iterations;
        let sem = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut batches = Vec::with_capacity(queries.len());

        for q in queries {
            tracing::info!(event = "query.start", query = %q.name, iterations);

            let acc = Arc::new(Mutex::new(QueryAccumulator::new(q.clone(), iterations)));
            let sql: Arc<str> = Arc::from(q.sql.as_str());
            let name: Arc<str> = Arc::from(q.name.as_str());
            let mut handles = Vec::with_capacity(iterations);

            for i in 0..iterations {
                let permit = sem.clone().acquire_owned().await?;
                let backend = self.backend.clone();
                let acc = acc.clone();
                let sql = sql.clone();
                let name = name.clone();
                let limit = self.settings.timeout;
                let verbose = self.settings.verbose;

                handles.push(tokio::spawn(async move {
                    let _permit = permit;
                    let execution = execute_once(backend.as_ref(), &sql, limit).await;

                    if verbose && (i == 0 || (i + 1) % 10 == 0) {
                        match &execution.error {
                            Some(msg) => tracing::info!(
                                query = %name,
                                iteration = i + 1,
                                error = %msg,
                                "iteration failed"
                            ),
                            None => tracing::info!(
                                query = %name,
                                iteration = i + 1,
                                duration_ms = as_ms(execution.duration),
                                rows = execution.row_count,
                                "iteration done"
                            ),
                        }
                    }

                    lock(&acc).record(execution);
                }));
            }

            batches.push(Batch { acc, handles });
        }

        let mut results = Vec::with_capacity(batches.len());
        for batch in batches {
            let result = self.finish_batch(batch).await;
            log_result(&result);
            results.push(result);
        }
        Ok(results)
    }

    async fn finish_batch(&self, batch: Batch) -> QueryResult {
        let Batch { acc, handles } = batch;

        for h in handles {
            if let Err(e) = h.await {
                // the task died before merging; keep the execution count whole
                tracing::warn!(event = "execution.task_failed", error = %e);
                lock(&acc).record(Execution::failure(
                    Utc::now(),
                    Duration::ZERO,
                    format!("execution task failed: {}", e),
                ));
            }
        }

        let acc = match Arc::try_unwrap(acc) {
            Ok(m) => m.into_inner().unwrap_or_else(|e| e.into_inner()),
            Err(shared) => {
                let snapshot = lock(&shared).clone();
                snapshot
            }
        };
        acc.finish()
    }
}

fn log_result(r: &QueryResult) {
    tracing::info!(
        event = "query.finished",
        query = %r.name,
        avg_ms = r.avg_ms(),
        p95_ms = r.percentile95.map(as_ms),
        rows = r.rows_affected,
        successful = r.successful_executions,
        errors = r.errors,
        complexity = %r.query_complexity,
        "query results"
    );
}
