use super::QueryBackend;
use crate::model::EnvironmentSnapshot;
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

static MEMORY_DB_SEQ: AtomicUsize = AtomicUsize::new(0);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Target {
    File(PathBuf),
    /// Shared-cache URI; the keepalive connection holds the database open.
    Memory(String),
}

struct Pool {
    target: Target,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
    _keepalive: Mutex<Option<Connection>>,
}

impl Pool {
    fn open_connection(&self) -> rusqlite::Result<Connection> {
        let conn = match &self.target {
            Target::File(path) => Connection::open(path)?,
            Target::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn checkout(&self) -> anyhow::Result<Connection> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => self.open_connection().context("failed to open sqlite connection"),
        }
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

/// Interrupts the statement running on a connection if the owning future is
/// dropped (for example by a timeout) before the blocking call returns.
struct InterruptOnDrop {
    handle: Option<InterruptHandle>,
}

impl InterruptOnDrop {
    fn disarm(&mut self) {
        self.handle = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            h.interrupt();
        }
    }
}

/// Pooled rusqlite backend. Statements run on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: Arc<Pool>,
}

impl SqliteBackend {
    pub fn open(path: &Path, pool_size: usize) -> anyhow::Result<Self> {
        let backend = Self::with_target(Target::File(path.to_path_buf()), pool_size, false)?;
        // fail fast on unopenable paths
        let conn = backend
            .pool
            .checkout()
            .with_context(|| format!("failed to open sqlite db: {}", path.display()))?;
        backend.pool.checkin(conn);
        Ok(backend)
    }

    /// A private in-memory database shared by every pooled connection.
    pub fn memory(pool_size: usize) -> anyhow::Result<Self> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:querybench-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            seq
        );
        Self::with_target(Target::Memory(uri), pool_size, true)
    }

    fn with_target(target: Target, pool_size: usize, keepalive: bool) -> anyhow::Result<Self> {
        let pool = Pool {
            target,
            idle: Mutex::new(Vec::new()),
            max_idle: pool_size.max(1),
            _keepalive: Mutex::new(None),
        };
        if keepalive {
            let conn = pool
                .open_connection()
                .context("failed to open in-memory sqlite db")?;
            *pool._keepalive.lock().unwrap_or_else(|e| e.into_inner()) = Some(conn);
        }
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Runs setup statements (schema, fixtures) outside of any measurement.
    pub async fn execute_batch(&self, sql: &str) -> anyhow::Result<()> {
        let sql = sql.to_string();
        self.with_connection(move |conn| conn.execute_batch(&sql).map_err(Into::into))
            .await
    }

    async fn with_connection<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let conn = self.pool.checkout()?;
        let mut guard = InterruptOnDrop {
            handle: Some(conn.get_interrupt_handle()),
        };

        let (conn, res) = tokio::task::spawn_blocking(move || {
            let res = f(&conn);
            (conn, res)
        })
        .await
        .context("sqlite worker failed")?;

        guard.disarm();
        self.pool.checkin(conn);
        res
    }
}

fn count_rows(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut n = 0u64;
    while rows.next()?.is_some() {
        n += 1;
    }
    Ok(n)
}

#[async_trait]
impl QueryBackend for SqliteBackend {
    async fn row_count(&self, sql: &str) -> anyhow::Result<u64> {
        let sql = sql.to_string();
        self.with_connection(move |conn| count_rows(conn, &sql).map_err(Into::into))
            .await
    }

    async fn snapshot(&self) -> anyhow::Result<EnvironmentSnapshot> {
        self.with_connection(|conn| {
            let version: String = conn.query_row("SELECT sqlite_version()", [], |r| r.get(0))?;
            let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0))?;
            let page_count: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;

            let mut details = BTreeMap::new();
            details.insert("journalMode".to_string(), serde_json::json!(journal_mode));
            details.insert("pageCount".to_string(), serde_json::json!(page_count));
            details.insert("pageSize".to_string(), serde_json::json!(page_size));

            Ok(EnvironmentSnapshot {
                backend: "sqlite".to_string(),
                version: Some(version),
                details,
            })
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
