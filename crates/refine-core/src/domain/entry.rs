//! Task log entries and the lock key.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunStatus;

/// Identifier of a task log row. Larger ids are more recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskLogId(i64);

impl TaskLogId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-log-{}", self.0)
    }
}

/// Per-invocation values that make up the lock key besides the task name.
///
/// Built once by the caller and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    pub hostname: String,
    /// JSON array of the arguments passed through to the task.
    pub params: String,
}

impl DispatchContext {
    pub fn new(hostname: impl Into<String>, args: &[String]) -> Self {
        Self {
            hostname: hostname.into(),
            params: encode_params(args),
        }
    }
}

fn encode_params(args: &[String]) -> String {
    // a slice of strings always serializes
    serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string())
}

/// `(task, params, hostname)`: one logical recurring job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    pub task: String,
    pub params: String,
    pub hostname: String,
}

impl LockKey {
    pub fn new(task: impl Into<String>, context: &DispatchContext) -> Self {
        Self {
            task: task.into(),
            params: context.params.clone(),
            hostname: context.hostname.clone(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @{}", self.task, self.params, self.hostname)
    }
}

/// One row of the task log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    pub id: TaskLogId,
    pub task: String,
    pub params: String,
    pub hostname: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub finish_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl TaskLogEntry {
    /// A fresh `running` entry for `key`.
    pub fn running(id: TaskLogId, key: &LockKey, now: DateTime<Utc>) -> Self {
        Self {
            id,
            task: key.task.clone(),
            params: key.params.clone(),
            hostname: key.hostname.clone(),
            status: RunStatus::Running,
            created_at: now,
            finish_at: None,
            error_message: None,
        }
    }

    pub fn matches(&self, key: &LockKey) -> bool {
        self.task == key.task && self.params == key.params && self.hostname == key.hostname
    }

    /// Move to a terminal status.
    pub fn finish(&mut self, status: RunStatus, error_message: Option<String>, at: DateTime<Utc>) {
        self.status = status;
        self.error_message = error_message;
        self.finish_at = Some(at);
    }
}
