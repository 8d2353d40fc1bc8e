//! InMemoryTaskLog - 開発用・テスト用の task_log
//!
//! # 実装詳細
//! - Vec<TaskLogEntry> が正本（id は 1 から連番）
//! - tokio::sync::Mutex を読み取り → 判定 → 書き込みの間ずっと保持する
//!   （同じインスタンスを共有する呼び出し同士では原子的）

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{decide, LockDecision, LockKey, RunStatus, TaskLogEntry, TaskLogId, TIMEOUT_MESSAGE};
use crate::ports::{AcquireResult, StoreError, TaskLogStore};

struct InMemoryState {
    entries: Vec<TaskLogEntry>,
    next_id: i64,
}

impl InMemoryState {
    fn allocate_id(&mut self) -> TaskLogId {
        let id = TaskLogId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn latest(&self, key: &LockKey) -> Option<&TaskLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.matches(key))
            .max_by_key(|e| e.id)
    }

    fn get_mut(&mut self, id: TaskLogId) -> Option<&mut TaskLogEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

pub struct InMemoryTaskLog {
    state: Mutex<InMemoryState>,
}

impl InMemoryTaskLog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                entries: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Insert an entry as-is (for seeding fixtures). Its id is replaced.
    pub async fn insert(&self, mut entry: TaskLogEntry) -> TaskLogId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        entry.id = id;
        state.entries.push(entry);
        id
    }

    /// All entries, oldest first.
    pub async fn entries(&self) -> Vec<TaskLogEntry> {
        self.state.lock().await.entries.clone()
    }
}

impl Default for InMemoryTaskLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskLogStore for InMemoryTaskLog {
    async fn try_acquire(
        &self,
        key: &LockKey,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<AcquireResult, StoreError> {
        let mut state = self.state.lock().await;

        let decision = decide(state.latest(key), now, stale_after);
        let reclaimed = match decision {
            LockDecision::Held(id) => {
                let holder = state
                    .entries
                    .iter()
                    .find(|e| e.id == id)
                    .cloned()
                    .ok_or(StoreError::NotFound(id))?;
                return Ok(AcquireResult::Busy { holder });
            }
            LockDecision::Reclaim(id) => {
                let stale = state.get_mut(id).ok_or(StoreError::NotFound(id))?;
                stale.finish(RunStatus::Error, Some(TIMEOUT_MESSAGE.to_string()), now);
                Some(id)
            }
            LockDecision::Vacant => None,
        };

        let id = state.allocate_id();
        let entry = TaskLogEntry::running(id, key, now);
        state.entries.push(entry.clone());
        Ok(AcquireResult::Acquired { entry, reclaimed })
    }

    async fn finish(
        &self,
        id: TaskLogId,
        status: RunStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let entry = state.get_mut(id).ok_or(StoreError::NotFound(id))?;
        if entry.status.is_terminal() {
            return Err(StoreError::AlreadyFinished(id));
        }
        entry.finish(status, error_message, at);
        Ok(())
    }

    async fn latest(&self, key: &LockKey) -> Result<Option<TaskLogEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.latest(key).cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TaskLogEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.entries.iter().rev().take(limit).cloned().collect())
    }
}
