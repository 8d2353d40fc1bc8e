//! Dispatcher - CLI 呼び出し 1 回分の処理
//!
//! # フロー
//! 1. 識別子をパース（空 / help ならタスク一覧）
//! 2. Resolver でタスクを引く
//! 3. メソッドを決める（help 置き換え）→ 呼べなければ MethodNotFound
//! 4. task_log が有効ならロックを取る（取れなければ AlreadyRunning）
//! 5. init → メソッド実行
//! 6. 結果を ok / error として記録
//!
//! タスク自身のエラーは記録して Failed を返すだけ。ストレージのエラーは Err で返す。

use std::sync::Arc;

use tracing::{info, warn};

use super::help;
use super::lock::{LockOutcome, RunLockManager};
use super::resolver::{ResolvedTask, Resolver};
use crate::domain::{DispatchContext, LockKey, ParsedRequest, RefineError, TaskError, TaskIdentifier};
use crate::ports::Console;
use crate::registry::TaskRegistry;

/// Operation substituted when help is requested.
pub const HELP_METHOD: &str = "help";

/// Pass-through argument that requests a task's help.
pub const HELP_FLAG: &str = "--help";

/// Console line when the lock is held by another run.
pub const ALREADY_RUNNING_MESSAGE: &str = "Task_log: Task is already running...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Raw `[module::]task[:method]`.
    pub task: String,
    /// Passed verbatim to the task.
    pub args: Vec<String>,
    pub help: bool,
}

impl DispatchRequest {
    /// `help` is set when `args` contains `--help`.
    pub fn new(task: impl Into<String>, args: Vec<String>) -> Self {
        let help = args.iter().any(|a| a == HELP_FLAG);
        Self {
            task: task.into(),
            args,
            help,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The task listing was written.
    Help,
    /// The operation returned normally.
    Completed { output: Option<String> },
    /// The operation raised an error; it was recorded.
    Failed { message: String },
    /// Another run holds the lock; nothing was executed.
    AlreadyRunning,
}

pub struct Dispatcher {
    pub(super) registry: Arc<TaskRegistry>,
    pub(super) locks: Option<RunLockManager>,
    pub(super) console: Arc<dyn Console>,
    pub(super) hostname: String,
    pub(super) program: String,
}

impl Dispatcher {
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn task_log_enabled(&self) -> bool {
        self.locks.is_some()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Write the task listing.
    pub fn help(&self) {
        let listings = help::discover(&self.registry);
        self.console.write_line(&help::render(&self.program, &listings));
    }

    pub async fn run(&self, request: DispatchRequest) -> Result<DispatchOutcome, RefineError> {
        let identifier = match TaskIdentifier::parse(&request.task) {
            ParsedRequest::Help => {
                self.help();
                return Ok(DispatchOutcome::Help);
            }
            ParsedRequest::Task(identifier) => identifier,
        };

        let resolved = Resolver::new(&self.registry).resolve(&identifier)?;
        let (method, run_init) = select_method(&resolved, request.help)?;

        let lock = match &self.locks {
            Some(locks) => {
                let context = DispatchContext::new(self.hostname.clone(), &request.args);
                let key = LockKey::new(resolved.qualified_name(), &context);
                match locks.acquire(&key).await? {
                    LockOutcome::Acquired(lock) => Some(lock),
                    LockOutcome::AlreadyRunning(_) => {
                        self.console.write_line(ALREADY_RUNNING_MESSAGE);
                        return Ok(DispatchOutcome::AlreadyRunning);
                    }
                }
            }
            None => None,
        };

        let result = execute(&resolved, &method, run_init, &request.args).await;

        match result {
            Ok(output) => {
                if let Some(text) = &output {
                    self.console.write_line(text);
                }
                if let (Some(locks), Some(lock)) = (&self.locks, lock) {
                    locks.ack(lock).await?;
                }
                info!(task = %resolved.qualified_name(), method = %method, "task completed");
                Ok(DispatchOutcome::Completed { output })
            }
            Err(error) => {
                warn!(task = %resolved.qualified_name(), method = %method, error = %error, "task failed");
                if let (Some(locks), Some(lock)) = (&self.locks, lock) {
                    locks.fail(lock, error.message()).await?;
                }
                Ok(DispatchOutcome::Failed {
                    message: error.message().to_string(),
                })
            }
        }
    }
}

/// Pick the operation to run and whether the init hook applies.
fn select_method(resolved: &ResolvedTask, help_flag: bool) -> Result<(String, bool), RefineError> {
    let descriptor = resolved.task.descriptor();
    let requested = &resolved.identifier.method;

    let wants_help = help_flag || requested == HELP_METHOD;
    if wants_help && descriptor.is_callable(HELP_METHOD) {
        return Ok((HELP_METHOD.to_string(), false));
    }

    if !descriptor.is_callable(requested) {
        return Err(RefineError::MethodNotFound {
            task: resolved.qualified_name(),
            method: requested.clone(),
            methods: descriptor.methods().to_vec(),
        });
    }
    Ok((requested.clone(), descriptor.has_init()))
}

async fn execute(
    resolved: &ResolvedTask,
    method: &str,
    run_init: bool,
    args: &[String],
) -> Result<Option<String>, TaskError> {
    if run_init {
        resolved.task.init().await?;
    }
    resolved.task.invoke(method, args).await
}
