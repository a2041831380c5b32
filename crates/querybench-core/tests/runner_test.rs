use querybench_core::config::RunConfig;
use querybench_core::engine::Runner;
use querybench_core::model::{Complexity, QuerySpec};
use querybench_core::providers::db::{FakeBackend, FakeReply};
use std::sync::Arc;
use std::time::Duration;

fn query(name: &str, sql: &str, weight: u32) -> QuerySpec {
    QuerySpec {
        name: name.into(),
        description: format!("{} query", name),
        sql: sql.into(),
        weight,
    }
}

fn config(iterations: usize, concurrency: usize) -> RunConfig {
    RunConfig {
        iterations,
        concurrency,
        timeout_seconds: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_select_all_succeed() -> anyhow::Result<()> {
    let fake = Arc::new(FakeBackend::new(
        FakeReply::rows(0).with_latency(Duration::from_millis(2)),
    ));
    let runner = Runner::new(fake.clone(), config(10, 3));

    let results = runner.run_queries(&[query("ping", "SELECT 1", 5)]).await?;
    assert_eq!(results.len(), 1);

    let r = &results[0];
    assert_eq!(r.successful_executions, 10);
    assert_eq!(r.errors, 0);
    assert_eq!(r.executions.len(), 10);
    assert_eq!(r.rows_affected, 0);
    assert_eq!(r.weight, 5);
    assert_eq!(r.query_complexity, Complexity::Low);
    assert!(r.avg_duration.is_some());
    assert!(r.first_executed_at <= r.last_executed_at);
    assert!(fake.max_in_flight() <= 3);
    Ok(())
}

#[tokio::test]
async fn test_admission_gate_is_shared_across_queries() -> anyhow::Result<()> {
    let fake = Arc::new(FakeBackend::new(
        FakeReply::rows(1).with_latency(Duration::from_millis(10)),
    ));
    let runner = Runner::new(fake.clone(), config(8, 4));
    let queries: Vec<_> = (0..5)
        .map(|i| query(&format!("q{}", i), "SELECT * FROM t", 1))
        .collect();

    let results = runner.run_queries(&queries).await?;
    assert_eq!(results.len(), 5);
    assert_eq!(fake.calls(), 40);
    assert!(fake.max_in_flight() <= 4, "peak {}", fake.max_in_flight());
    assert!(fake.max_in_flight() >= 2);
    for r in &results {
        assert_eq!(r.successful_executions + r.errors, r.executions.len());
        assert_eq!(r.executions.len(), 8);
    }
    Ok(())
}

#[tokio::test]
async fn test_all_deadlocks_are_recorded_not_fatal() -> anyhow::Result<()> {
    let fake = Arc::new(
        FakeBackend::new(FakeReply::rows(3)).with_reply(
            "UPDATE accounts SET balance = 0",
            FakeReply::error("Error 1213: Deadlock found when trying to get lock"),
        ),
    );
    let runner = Runner::new(
        fake,
        RunConfig {
            label: "before".into(),
            ..config(12, 3)
        },
    );

    let run = runner
        .run(&[
            query("update", "UPDATE accounts SET balance = 0", 1),
            query("read", "SELECT * FROM accounts", 1),
        ])
        .await?;

    let dead = &run.query_results[0];
    assert_eq!(dead.errors, 12);
    assert_eq!(dead.successful_executions, 0);
    assert_eq!(dead.error_details.len(), 10);
    assert_eq!(dead.avg_duration, None);
    assert_eq!(dead.min_duration, None);
    assert_eq!(dead.percentile95, None);

    let read = &run.query_results[1];
    assert_eq!(read.successful_executions, 12);
    assert_eq!(read.rows_affected, 36);

    assert_eq!(run.label, "before");
    assert_eq!(run.config.iterations, dead.executions.len());
    assert_eq!(run.config.iterations, read.executions.len());
    assert_eq!(run.config.concurrency, 3);
    assert_eq!(run.environment.backend, "fake");
    assert_eq!(run.summary.errors_by_type.get("Deadlock"), Some(&12));
    assert_eq!(run.summary.failed_queries, 1);
    assert_eq!(run.summary.successful_queries, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_only_affects_its_own_execution() -> anyhow::Result<()> {
    let fake = Arc::new(
        FakeBackend::new(FakeReply::rows(1))
            .with_reply("slow", FakeReply::rows(1).with_latency(Duration::from_secs(2))),
    );
    let runner = Runner::new(
        fake,
        RunConfig {
            timeout_seconds: 1,
            verbose: true,
            ..config(3, 6)
        },
    );

    let results = runner
        .run_queries(&[query("slow", "slow", 1), query("fast", "fast", 1)])
        .await?;

    assert_eq!(results[0].errors, 3);
    assert!(results[0].error_details[0].contains("timeout"));
    assert_eq!(results[1].successful_executions, 3);
    Ok(())
}

#[tokio::test]
async fn test_intermittent_failures() -> anyhow::Result<()> {
    let fake = Arc::new(FakeBackend::new(
        FakeReply::rows(2).failing_every(4, "Lock wait timeout exceeded"),
    ));
    let runner = Runner::new(fake, config(20, 2));
    let run = runner.run(&[query("flaky", "SELECT id FROM t", 1)]).await?;

    let r = &run.query_results[0];
    assert_eq!(r.errors, 5);
    assert_eq!(r.successful_executions, 15);
    assert_eq!(r.rows_affected, 30);
    assert_eq!(run.config.iterations, r.executions.len());
    assert_eq!(run.summary.errors_by_type.get("Lock timeout"), Some(&5));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_executions_are_kept_in_completion_order() -> anyhow::Result<()> {
    // issued slowest first, so completion order is the reverse of issue order
    let fake = Arc::new(FakeBackend::new(FakeReply::rows(1).with_latencies(vec![
        Duration::from_millis(30),
        Duration::from_millis(20),
        Duration::from_millis(10),
    ])));
    let runner = Runner::new(fake.clone(), config(3, 3));

    let results = runner.run_queries(&[query("q", "SELECT 1", 1)]).await?;
    let durations: Vec<_> = results[0].executions.iter().map(|e| e.duration).collect();

    assert_eq!(fake.max_in_flight(), 3);
    assert_eq!(durations.len(), 3);
    assert!(
        durations.windows(2).all(|w| w[0] < w[1]),
        "expected finish order, got {:?}",
        durations
    );
    assert_eq!(results[0].min_duration, Some(durations[0]));
    assert_eq!(results[0].max_duration, Some(durations[2]));
    Ok(())
}
