//! RunLockManager - task_log を使った実行ロック
//!
//! 同じ (task, params, hostname) の実行を直列化し、結果を記録します。
//! lease に近い：15 分を超えて running のままのエントリは放棄されたとみなし、
//! 次の acquire が error に遷移させた上でロックを取り直します。
//!
//! # 状態遷移
//! - (なし) / ok / error → running（acquire）
//! - running（stale）→ error + 新しい running（acquire、同一操作）
//! - running（fresh）→ AlreadyRunning（acquire は失敗、エラーではない）
//! - running → ok（ack）/ error（fail）

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{LockKey, RunStatus, TaskLogEntry, TaskLogId, STALE_AFTER};
use crate::ports::{AcquireResult, Clock, StoreError, TaskLogStore};

/// A held lock. The holder must either `ack` or `fail` it.
#[derive(Debug)]
#[must_use = "a run lock stays `running` until acked or failed"]
pub struct RunLock {
    entry: TaskLogEntry,
}

impl RunLock {
    pub fn id(&self) -> TaskLogId {
        self.entry.id
    }

    pub fn entry(&self) -> &TaskLogEntry {
        &self.entry
    }
}

#[derive(Debug)]
pub enum LockOutcome {
    Acquired(RunLock),
    /// Another fresh run holds the key.
    AlreadyRunning(TaskLogEntry),
}

#[derive(Clone)]
pub struct RunLockManager {
    store: Arc<dyn TaskLogStore>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,
}

impl RunLockManager {
    pub fn new(store: Arc<dyn TaskLogStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            stale_after: STALE_AFTER,
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskLogStore> {
        &self.store
    }

    /// Take the lock for `key`. Storage failures propagate; nothing runs unlocked.
    pub async fn acquire(&self, key: &LockKey) -> Result<LockOutcome, StoreError> {
        let now = self.clock.now();
        match self.store.try_acquire(key, now, self.stale_after).await? {
            AcquireResult::Acquired { entry, reclaimed } => {
                if let Some(stale) = reclaimed {
                    warn!(%key, stale = %stale, "reclaimed task lock running over the staleness threshold");
                }
                info!(%key, id = %entry.id, "task lock acquired");
                Ok(LockOutcome::Acquired(RunLock { entry }))
            }
            AcquireResult::Busy { holder } => {
                info!(%key, holder = %holder.id, since = %holder.created_at, "task is already running");
                Ok(LockOutcome::AlreadyRunning(holder))
            }
        }
    }

    /// Mark success.
    pub async fn ack(&self, lock: RunLock) -> Result<(), StoreError> {
        self.release(lock, RunStatus::Ok, None).await
    }

    /// Mark failure with the task's error message.
    pub async fn fail(&self, lock: RunLock, error: impl Into<String>) -> Result<(), StoreError> {
        self.release(lock, RunStatus::Error, Some(error.into())).await
    }

    /// Finish the entry. One reclaimed in the meantime is left as is.
    async fn release(
        &self,
        lock: RunLock,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let at = self.clock.now();
        match self.store.finish(lock.id(), status, error_message, at).await {
            Ok(()) => {
                info!(id = %lock.id(), task = %lock.entry.task, %status, "task lock released");
                Ok(())
            }
            Err(StoreError::AlreadyFinished(id)) => {
                warn!(%id, task = %lock.entry.task, %status, "task lock was reclaimed before the run finished");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::domain::{DispatchContext, TIMEOUT_MESSAGE};
    use crate::impls::InMemoryTaskLog;
    use crate::ports::FixedClock;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn key() -> LockKey {
        LockKey::new("migrate", &DispatchContext::new("web-1", &[]))
    }

    fn manager(store: &Arc<InMemoryTaskLog>, at: DateTime<Utc>) -> RunLockManager {
        let store: Arc<dyn TaskLogStore> = store.clone();
        RunLockManager::new(store, Arc::new(FixedClock::new(at)))
    }

    #[tokio::test]
    async fn ack_transitions_to_ok_with_finish_time() {
        let store = Arc::new(InMemoryTaskLog::new());
        let LockOutcome::Acquired(lock) = manager(&store, t0()).acquire(&key()).await.unwrap() else {
            panic!("expected Acquired");
        };
        let done = t0() + TimeDelta::seconds(12);
        manager(&store, done).ack(lock).await.unwrap();

        let entry = store.latest(&key()).await.unwrap().unwrap();
        assert_eq!(entry.status, RunStatus::Ok);
        assert_eq!(entry.finish_at, Some(done));
        assert_eq!(entry.error_message, None);
    }

    #[tokio::test]
    async fn fail_records_message() {
        let store = Arc::new(InMemoryTaskLog::new());
        let m = manager(&store, t0());
        let LockOutcome::Acquired(lock) = m.acquire(&key()).await.unwrap() else {
            panic!("expected Acquired");
        };
        m.fail(lock, "connection refused").await.unwrap();

        let entry = store.latest(&key()).await.unwrap().unwrap();
        assert_eq!(entry.status, RunStatus::Error);
        assert_eq!(entry.error_message.as_deref(), Some("connection refused"));
        assert_eq!(entry.finish_at, Some(t0()));
    }

    #[tokio::test]
    async fn held_lock_reports_already_running() {
        let store = Arc::new(InMemoryTaskLog::new());
        let m = manager(&store, t0());
        let LockOutcome::Acquired(first) = m.acquire(&key()).await.unwrap() else {
            panic!("expected Acquired");
        };

        let later = manager(&store, t0() + TimeDelta::seconds(899));
        let outcome = later.acquire(&key()).await.unwrap();
        assert!(matches!(outcome, LockOutcome::AlreadyRunning(ref holder) if holder.id == first.id()));
        m.ack(first).await.unwrap();
    }

    #[tokio::test]
    async fn stale_lock_is_taken_over() {
        let store = Arc::new(InMemoryTaskLog::new());
        let LockOutcome::Acquired(abandoned) = manager(&store, t0()).acquire(&key()).await.unwrap()
        else {
            panic!("expected Acquired");
        };

        let later = manager(&store, t0() + TimeDelta::seconds(901));
        let LockOutcome::Acquired(fresh) = later.acquire(&key()).await.unwrap() else {
            panic!("expected Acquired");
        };
        assert_ne!(fresh.id(), abandoned.id());

        let entries = store.entries().await;
        let old = entries.iter().find(|e| e.id == abandoned.id()).unwrap();
        assert_eq!(old.status, RunStatus::Error);
        assert_eq!(old.error_message.as_deref(), Some(TIMEOUT_MESSAGE));
        later.ack(fresh).await.unwrap();
    }

    #[tokio::test]
    async fn late_ack_keeps_the_timeout_record() {
        let store = Arc::new(InMemoryTaskLog::new());
        let slow_manager = manager(&store, t0());
        let LockOutcome::Acquired(slow) = slow_manager.acquire(&key()).await.unwrap() else {
            panic!("expected Acquired");
        };
        let slow_id = slow.id();

        let later = manager(&store, t0() + TimeDelta::seconds(901));
        let LockOutcome::Acquired(fresh) = later.acquire(&key()).await.unwrap() else {
            panic!("expected Acquired");
        };

        // the slow run finishes after being reclaimed
        manager(&store, t0() + TimeDelta::seconds(950)).ack(slow).await.unwrap();

        let entries = store.entries().await;
        let old = entries.iter().find(|e| e.id == slow_id).unwrap();
        assert_eq!(old.status, RunStatus::Error);
        assert_eq!(old.error_message.as_deref(), Some(TIMEOUT_MESSAGE));
        assert_eq!(old.finish_at, Some(t0() + TimeDelta::seconds(901)));

        later.fail(fresh, "boom").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_acquire_one_wins() {
        let store = Arc::new(InMemoryTaskLog::new());
        let m = manager(&store, t0());
        let (first, second) = (key(), key());
        let (a, b) = tokio::join!(m.acquire(&first), m.acquire(&second));

        let outcomes = [a.unwrap(), b.unwrap()];
        let acquired = outcomes
            .iter()
            .filter(|o| matches!(o, LockOutcome::Acquired(_)))
            .count();
        assert_eq!(acquired, 1);
        assert!(outcomes.iter().any(|o| matches!(o, LockOutcome::AlreadyRunning(_))));
    }
}
