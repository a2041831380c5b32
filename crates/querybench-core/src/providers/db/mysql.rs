use super::QueryBackend;
use crate::model::EnvironmentSnapshot;
use anyhow::Context;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::collections::BTreeMap;
use std::time::Duration;

const STATUS_VARS: &[&str] = &[
    "Threads_running",
    "Threads_connected",
    "Open_tables",
    "Slow_queries",
    "Uptime",
    "Questions",
    "Innodb_deadlocks",
];

pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Pool allows twice the concurrency cap, keeping `concurrency` connections warm.
    pub async fn connect(url: &str, concurrency: usize) -> anyhow::Result<Self> {
        let warm = u32::try_from(concurrency.max(1)).unwrap_or(u32::MAX);
        let pool = MySqlPoolOptions::new()
            .max_connections(warm.saturating_mul(2))
            .min_connections(warm)
            .max_lifetime(Duration::from_secs(300))
            .connect(url)
            .await
            .context("error connecting to mysql")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl QueryBackend for MySqlBackend {
    async fn row_count(&self, sql: &str) -> anyhow::Result<u64> {
        let mut rows = sqlx::raw_sql(sql).fetch(&self.pool);
        let mut n = 0u64;
        while rows.try_next().await?.is_some() {
            n += 1;
        }
        Ok(n)
    }

    async fn snapshot(&self) -> anyhow::Result<EnvironmentSnapshot> {
        let version: String = sqlx::query_scalar("SELECT VERSION()")
            .fetch_one(&self.pool)
            .await
            .context("failed to read server version")?;

        let placeholders = STATUS_VARS
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(", ");
        let status: Vec<(String, String)> = sqlx::query_as(&format!(
            "SHOW GLOBAL STATUS WHERE Variable_name IN ({})",
            placeholders
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to read global status")?;

        let mut details = BTreeMap::new();
        let mut uptime = 0u64;
        let mut questions = 0u64;
        for (name, value) in status {
            let parsed = value.parse::<u64>().ok();
            match name.as_str() {
                "Uptime" => uptime = parsed.unwrap_or(0),
                "Questions" => questions = parsed.unwrap_or(0),
                _ => {}
            }
            let value = parsed
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::String(value));
            details.insert(name, value);
        }
        if uptime > 0 {
            details.insert(
                "questionsPerSecond".to_string(),
                serde_json::json!(questions as f64 / uptime as f64),
            );
        }

        Ok(EnvironmentSnapshot {
            backend: "mysql".to_string(),
            version: Some(version),
            details,
        })
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}
