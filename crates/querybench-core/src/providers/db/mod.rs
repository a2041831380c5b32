use crate::model::EnvironmentSnapshot;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// A shared database handle. Implementations are pooled and safe to call from
/// many tasks at once.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Executes `sql` and drains the cursor, returning how many rows came back.
    /// Errors raised while iterating rows are reported the same way as errors
    /// raised while issuing the statement.
    async fn row_count(&self, sql: &str) -> anyhow::Result<u64>;

    async fn ping(&self) -> anyhow::Result<()> {
        self.row_count("SELECT 1").await.map(|_| ())
    }

    async fn snapshot(&self) -> anyhow::Result<EnvironmentSnapshot>;

    fn backend_name(&self) -> &'static str;
}

pub mod fake;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;

pub use fake::{FakeBackend, FakeReply};
pub use sqlite::SqliteBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dsn {
    Sqlite(PathBuf),
    SqliteMemory,
    MySql(String),
}

impl Dsn {
    /// Accepts `sqlite://path`, `sqlite::memory:`, `mysql://...` and the
    /// driver-style `user:pass@tcp(host:port)/db` MySQL form.
    pub fn parse(dsn: &str) -> anyhow::Result<Self> {
        let dsn = dsn.trim();
        if dsn == "sqlite::memory:" || dsn == "sqlite://:memory:" {
            return Ok(Dsn::SqliteMemory);
        }
        if let Some(path) = dsn.strip_prefix("sqlite://") {
            if path.is_empty() {
                anyhow::bail!("config error: sqlite dsn has no path");
            }
            return Ok(Dsn::Sqlite(PathBuf::from(path)));
        }
        if dsn.starts_with("mysql://") {
            return Ok(Dsn::MySql(dsn.to_string()));
        }
        if let Some(url) = driver_style_mysql(dsn) {
            return Ok(Dsn::MySql(url));
        }
        anyhow::bail!("config error: unsupported dsn '{}'", redact_dsn(dsn))
    }
}

fn driver_style_mysql(dsn: &str) -> Option<String> {
    let (creds, rest) = dsn.rsplit_once("@tcp(")?;
    let (addr, db) = rest.split_once(')')?;
    let db = db.strip_prefix('/').unwrap_or(db);
    Some(format!("mysql://{}@{}/{}", creds, addr, db))
}

/// Hides the password portion of a DSN for logs and error messages.
pub fn redact_dsn(dsn: &str) -> String {
    let Some((creds, rest)) = dsn.rsplit_once('@') else {
        return dsn.to_string();
    };
    let (scheme, userinfo) = match creds.split_once("://") {
        Some((s, u)) => (format!("{}://", s), u),
        None => (String::new(), creds),
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{}{}:***@{}", scheme, user, rest),
        None => dsn.to_string(),
    }
}

/// Opens the backend named by `dsn`, sizing its pool from the concurrency cap.
pub async fn connect(dsn: &str, concurrency: usize) -> anyhow::Result<Arc<dyn QueryBackend>> {
    let backend: Arc<dyn QueryBackend> = match Dsn::parse(dsn)? {
        Dsn::Sqlite(path) => Arc::new(SqliteBackend::open(&path, concurrency)?),
        Dsn::SqliteMemory => Arc::new(SqliteBackend::memory(concurrency)?),
        #[cfg(feature = "mysql")]
        Dsn::MySql(url) => Arc::new(mysql::MySqlBackend::connect(&url, concurrency).await?),
        #[cfg(not(feature = "mysql"))]
        Dsn::MySql(_) => anyhow::bail!(
            "config error: built without MySQL support (rebuild with the `mysql` feature)"
        ),
    };

    backend.ping().await?;
    tracing::info!(
        event = "backend.connected",
        backend = backend.backend_name(),
        dsn = %redact_dsn(dsn),
        pool = concurrency
    );
    Ok(backend)
}
