//! TaskLogStore port - task_log テーブルの正本
//!
//! TaskLogStore は以下を管理します：
//! - ロックの取得（最新エントリの読み取り → 判定 → 書き込みを一つの原子的操作で）
//! - stale なエントリの回収（同じ操作の中で error に遷移させて再取得）
//! - 完了の記録（ok / error）
//!
//! # 設計原則
//! - 判定ロジックは domain::decision::decide（純粋関数）
//! - ストレージ障害は StoreError として必ず呼び出し元に返す（fail-closed）

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{LockKey, RunStatus, TaskLogEntry, TaskLogId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("entry {0} not found")]
    NotFound(TaskLogId),

    /// The entry already reached a terminal status (e.g. it was reclaimed).
    #[error("entry {0} is already finished")]
    AlreadyFinished(TaskLogId),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("blocking task failed: {0}")]
    Join(String),
}

/// Result of a conditional acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireResult {
    /// A new `running` entry was inserted.
    Acquired {
        entry: TaskLogEntry,
        /// Stale entry that was moved to `error` in the same operation.
        reclaimed: Option<TaskLogId>,
    },

    /// A fresh `running` entry already holds the key.
    Busy { holder: TaskLogEntry },
}

#[async_trait]
pub trait TaskLogStore: Send + Sync {
    /// Insert a `running` entry for `key` unless a non-stale one exists.
    ///
    /// Read, decide and write happen atomically with respect to other callers
    /// of the same store (and other processes, for shared stores).
    async fn try_acquire(
        &self,
        key: &LockKey,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<AcquireResult, StoreError>;

    /// Move entry `id` from `running` to a terminal status.
    ///
    /// A terminal entry is never rewritten: `AlreadyFinished`.
    async fn finish(
        &self,
        id: TaskLogId,
        status: RunStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Most recent entry for `key` (highest id).
    async fn latest(&self, key: &LockKey) -> Result<Option<TaskLogEntry>, StoreError>;

    /// Up to `limit` most recent entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<TaskLogEntry>, StoreError>;
}
