//! AppBuilder - Dispatcher の構築とワイヤリング
//!
//! # 既定値
//! - task_log なし（ロックも記録もしない）
//! - SystemClock / StdoutConsole
//! - hostname は空文字列、program は "refine"

use std::sync::Arc;

use super::dispatcher::Dispatcher;
use super::lock::RunLockManager;
use crate::ports::{Clock, Console, StdoutConsole, SystemClock, TaskLogStore};
use crate::registry::TaskRegistry;

pub const DEFAULT_PROGRAM: &str = "refine";

/// Wires a [`Dispatcher`] from a registry and optional task log.
///
/// ```ignore
/// let dispatcher = AppBuilder::new(registry)
///     .task_log(Arc::new(SqliteTaskLog::open("refine.db")?))
///     .hostname("web-1")
///     .build();
/// ```
pub struct AppBuilder {
    registry: TaskRegistry,
    store: Option<Arc<dyn TaskLogStore>>,
    clock: Arc<dyn Clock>,
    console: Arc<dyn Console>,
    hostname: String,
    program: String,
}

impl AppBuilder {
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry,
            store: None,
            clock: Arc::new(SystemClock),
            console: Arc::new(StdoutConsole),
            hostname: String::new(),
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Enable locking and run recording.
    pub fn task_log(mut self, store: Arc<dyn TaskLogStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn maybe_task_log(mut self, store: Option<Arc<dyn TaskLogStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Name shown in help and usage hints.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn build(self) -> Dispatcher {
        let clock = self.clock;
        let locks = self.store.map(|store| RunLockManager::new(store, clock));
        Dispatcher {
            registry: Arc::new(self.registry),
            locks,
            console: self.console,
            hostname: self.hostname,
            program: self.program,
        }
    }
}
