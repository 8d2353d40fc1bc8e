//! Errors - エラー型と分類
//!
//! - 解決エラー（ModuleNotFound / TaskNotFound / MethodNotFound）: 呼び出しを終了させる
//! - ストレージエラー（Store）: 致命的。握りつぶさない
//! - タスク実行エラー（TaskError）: 記録するだけで dispatcher は落ちない

use thiserror::Error;

use crate::ports::StoreError;

/// Hard failures of a dispatch.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Module \"{0}\" does not exist.")]
    ModuleNotFound(String),

    #[error("Task \"{task}\" does not exist.")]
    TaskNotFound { task: String },

    #[error("Task \"{task}\" does not exist. Did you mean \"{suggestion}\"?")]
    TaskNotFoundWithSuggestion { task: String, suggestion: String },

    #[error("Task \"{task}\" does not have a command called \"{method}\".")]
    MethodNotFound {
        task: String,
        method: String,
        /// Public operations of the task, for usage hints.
        methods: Vec<String>,
    },

    #[error("task log: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RefineError {
    /// Errors caused by what the user typed, as opposed to infrastructure.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            RefineError::ModuleNotFound(_)
                | RefineError::TaskNotFound { .. }
                | RefineError::TaskNotFoundWithSuggestion { .. }
                | RefineError::MethodNotFound { .. }
        )
    }
}

/// Error raised by a task's own operation. Recorded, never re-raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors while building a task registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task '{task}' is already registered in {location}")]
    AlreadyRegistered { task: String, location: String },

    #[error("module '{0}' is already registered")]
    DuplicateModule(String),
}
