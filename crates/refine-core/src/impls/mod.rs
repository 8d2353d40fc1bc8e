//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTaskLog**: 開発用・テスト用の task_log
//! - **SqliteTaskLog**: 本番用の task_log（複数プロセス間で排他）
//! - **ManifestTask**: TOML マニフェストで定義されたタスク（コマンドを実行）
//! - **FsCatalog**: タスク／モジュールのディレクトリを走査して TaskRegistry を作る

pub mod inmem_log;
pub mod sqlite_log;
pub mod manifest;
pub mod fs_catalog;

use std::path::PathBuf;

use thiserror::Error;

pub use self::inmem_log::InMemoryTaskLog;
pub use self::sqlite_log::SqliteTaskLog;
pub use self::manifest::{Action, ManifestTask, TaskManifest};
pub use self::fs_catalog::FsCatalog;

/// Errors while loading task definitions from disk.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid task manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot derive a task name from '{0}'")]
    InvalidName(PathBuf),
}
