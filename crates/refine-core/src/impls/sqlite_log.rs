//! SqliteTaskLog - SQLite に置く task_log
//!
//! # 実装詳細
//! - rusqlite の Connection を Arc<Mutex<_>> で保持し、spawn_blocking で実行
//! - try_acquire は `BEGIN IMMEDIATE` トランザクション内で
//!   最新エントリの読み取り → decide → UPDATE/INSERT を行う
//!   （書き込みロックを先に取るので、別プロセスの acquire とも直列化される）
//! - 時刻は unix ミリ秒（INTEGER）で保存。判定にも同じ精度の時刻を使う

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use crate::domain::{decide, LockDecision, LockKey, RunStatus, TaskLogEntry, TaskLogId, TIMEOUT_MESSAGE};
use crate::ports::{AcquireResult, StoreError, TaskLogStore};

/// How long a writer waits for another process's transaction.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS task_log (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    task          TEXT    NOT NULL,
    params        TEXT    NOT NULL,
    hostname      TEXT    NOT NULL,
    status        TEXT    NOT NULL,
    created_at    INTEGER NOT NULL,
    finish_at     INTEGER,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS task_log_key ON task_log (task, params, hostname, id);
";

const SELECT_COLUMNS: &str =
    "SELECT id, task, params, hostname, status, created_at, finish_at, error_message FROM task_log";

pub struct SqliteTaskLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening task log database");
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Whether the `task_log` table exists.
    pub fn has_table(&self) -> Result<bool, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'task_log'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create_table(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

/// Column values as stored.
struct RawEntry {
    id: i64,
    task: String,
    params: String,
    hostname: String,
    status: String,
    created_at: i64,
    finish_at: Option<i64>,
    error_message: Option<String>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            task: row.get("task")?,
            params: row.get("params")?,
            hostname: row.get("hostname")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            finish_at: row.get("finish_at")?,
            error_message: row.get("error_message")?,
        })
    }

    fn into_entry(self) -> Result<TaskLogEntry, StoreError> {
        let status = self.status.parse::<RunStatus>().map_err(StoreError::Corrupt)?;
        let finish_at = self.finish_at.map(from_millis).transpose()?;
        Ok(TaskLogEntry {
            id: TaskLogId::new(self.id),
            task: self.task,
            params: self.params,
            hostname: self.hostname,
            status,
            created_at: from_millis(self.created_at)?,
            finish_at,
            error_message: self.error_message,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {millis}")))
}

/// `at` at storage precision.
fn truncate_millis(at: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
    from_millis(at.timestamp_millis())
}

fn select_latest(conn: &Connection, key: &LockKey) -> Result<Option<TaskLogEntry>, StoreError> {
    let sql = format!(
        "{SELECT_COLUMNS} WHERE task = ?1 AND params = ?2 AND hostname = ?3 ORDER BY id DESC LIMIT 1"
    );
    conn.query_row(&sql, params![key.task, key.params, key.hostname], RawEntry::from_row)
        .optional()?
        .map(RawEntry::into_entry)
        .transpose()
}

fn update_status(
    conn: &Connection,
    id: TaskLogId,
    status: RunStatus,
    error_message: Option<&str>,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE task_log SET status = ?1, error_message = ?2, finish_at = ?3 WHERE id = ?4 AND status = ?5",
        params![
            status.as_str(),
            error_message,
            at.timestamp_millis(),
            id.get(),
            RunStatus::Running.as_str()
        ],
    )?;
    if changed > 0 {
        return Ok(());
    }

    let exists: Option<i64> = conn
        .query_row("SELECT id FROM task_log WHERE id = ?1", params![id.get()], |row| row.get(0))
        .optional()?;
    Err(match exists {
        Some(_) => StoreError::AlreadyFinished(id),
        None => StoreError::NotFound(id),
    })
}

#[async_trait]
impl TaskLogStore for SqliteTaskLog {
    async fn try_acquire(
        &self,
        key: &LockKey,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<AcquireResult, StoreError> {
        let key = key.clone();
        let now = truncate_millis(now)?;
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let latest = select_latest(&tx, &key)?;
            let decision = decide(latest.as_ref(), now, stale_after);
            let reclaimed = match decision {
                LockDecision::Held(id) => {
                    let holder = latest.ok_or(StoreError::NotFound(id))?;
                    return Ok(AcquireResult::Busy { holder });
                }
                LockDecision::Reclaim(id) => {
                    update_status(&tx, id, RunStatus::Error, Some(TIMEOUT_MESSAGE), now)?;
                    Some(id)
                }
                LockDecision::Vacant => None,
            };

            tx.execute(
                "INSERT INTO task_log (task, params, hostname, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    key.task,
                    key.params,
                    key.hostname,
                    RunStatus::Running.as_str(),
                    now.timestamp_millis()
                ],
            )?;
            let id = TaskLogId::new(tx.last_insert_rowid());
            tx.commit()?;

            Ok(AcquireResult::Acquired {
                entry: TaskLogEntry::running(id, &key, now),
                reclaimed,
            })
        })
        .await
    }

    async fn finish(
        &self,
        id: TaskLogId,
        status: RunStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.blocking(move |conn| update_status(conn, id, status, error_message.as_deref(), at))
            .await
    }

    async fn latest(&self, key: &LockKey) -> Result<Option<TaskLogEntry>, StoreError> {
        let key = key.clone();
        self.blocking(move |conn| select_latest(conn, &key)).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TaskLogEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.blocking(move |conn| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![limit], RawEntry::from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?.into_entry()?);
            }
            Ok(entries)
        })
        .await
    }
}
