//! refine-core
//!
//! Task dispatcher for command-line jobs: resolves `[module::]task[:method]`
//! against a registry of task definitions, serialises runs through a
//! persisted task log and records each run's outcome.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（identifier, descriptor, state, entry, decision, errors）
//! - **ports**: 抽象化レイヤー（TaskLogStore, TaskDefinition, Clock, Console）
//! - **impls**: 実装（InMemoryTaskLog, SqliteTaskLog, ManifestTask, FsCatalog）
//! - **registry**: タスク記述子のレジストリ（起動時に一度だけ構築）
//! - **app**: アプリケーションロジック（resolver, lock, help, dispatcher, builder）
//! - **config**: TOML 設定

pub mod domain;
pub mod ports;
pub mod impls;
pub mod registry;
pub mod app;
pub mod config;

pub use app::{AppBuilder, DispatchOutcome, DispatchRequest, Dispatcher};
pub use config::RefineConfig;
pub use domain::RefineError;
