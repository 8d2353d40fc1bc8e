//! Config - refine.toml の読み込み
//!
//! ```toml
//! program = "refine"
//! hostname = "web-1"
//!
//! [paths]
//! tasks = ["tasks"]
//! modules = ["modules"]
//!
//! [task_log]
//! enabled = true
//! database = "refine.db"
//! create_table = true
//! ```
//!
//! 相対パスは設定ファイルのあるディレクトリを基準に解決します。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::impls::{FsCatalog, SqliteTaskLog};
use crate::ports::StoreError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RefineConfig {
    /// Name shown in help output.
    #[serde(default = "default_program")]
    pub program: String,

    /// Host recorded in the task log; empty when unset.
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub task_log: TaskLogConfig,
}

fn default_program() -> String {
    "refine".to_string()
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            hostname: None,
            paths: PathsConfig::default(),
            task_log: TaskLogConfig::default(),
        }
    }
}

/// Where task manifests live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// App task directories, searched in order.
    #[serde(default = "default_task_dirs")]
    pub tasks: Vec<PathBuf>,

    /// Directories whose subdirectories are modules (`<dir>/<module>/tasks`).
    #[serde(default = "default_module_dirs")]
    pub modules: Vec<PathBuf>,
}

fn default_task_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("tasks")]
}

fn default_module_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("modules")]
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tasks: default_task_dirs(),
            modules: default_module_dirs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskLogConfig {
    /// Lock and record runs (default: false).
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Create the table when missing (default: true).
    #[serde(default = "default_create_table")]
    pub create_table: bool,
}

fn default_database() -> PathBuf {
    PathBuf::from("refine.db")
}

fn default_create_table() -> bool {
    true
}

impl Default for TaskLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            database: default_database(),
            create_table: default_create_table(),
        }
    }
}

impl TaskLogConfig {
    /// Open the configured store.
    ///
    /// `None` when disabled, or when the table is missing and may not be created.
    pub fn open(&self) -> Result<Option<SqliteTaskLog>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }

        let store = SqliteTaskLog::open(&self.database)?;
        if self.create_table {
            store.create_table()?;
        } else if !store.has_table()? {
            warn!(database = %self.database.display(), "task_log table is missing; running without task log");
            return Ok(None);
        }
        Ok(Some(store))
    }
}

impl RefineConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a file and resolve its relative paths against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.rebased(base))
    }

    /// Like [`RefineConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn rebased(mut self, base: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        self.paths.tasks = self.paths.tasks.iter().map(join).collect();
        self.paths.modules = self.paths.modules.iter().map(join).collect();
        self.task_log.database = join(&self.task_log.database);
        self
    }

    pub fn catalog(&self) -> FsCatalog {
        FsCatalog::new(self.paths.tasks.clone(), self.paths.modules.clone())
    }

    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = RefineConfig::from_toml("", Path::new("refine.toml")).unwrap();
        assert_eq!(config, RefineConfig::default());
        assert!(!config.task_log.enabled);
        assert_eq!(config.hostname(), "");
    }

    #[test]
    fn full_file_is_parsed() {
        let text = r#"
            program = "bin/refine"
            hostname = "web-1"

            [paths]
            tasks = ["app/tasks", "vendor/tasks"]

            [task_log]
            enabled = true
            database = "/var/lib/refine.db"
            create_table = false
        "#;
        let config = RefineConfig::from_toml(text, Path::new("refine.toml")).unwrap();
        assert_eq!(config.program, "bin/refine");
        assert_eq!(config.hostname(), "web-1");
        assert_eq!(config.paths.tasks.len(), 2);
        assert_eq!(config.paths.modules, [PathBuf::from("modules")]);
        assert!(config.task_log.enabled);
        assert!(!config.task_log.create_table);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RefineConfig::from_toml("[task_log]\nenable = true\n", Path::new("refine.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn load_rebases_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refine.toml");
        std::fs::write(&path, "[task_log]\ndatabase = \"data/refine.db\"\n").unwrap();

        let config = RefineConfig::load(&path).unwrap();
        assert_eq!(config.paths.tasks, [dir.path().join("tasks")]);
        assert_eq!(config.task_log.database, dir.path().join("data/refine.db"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RefineConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, RefineConfig::default());

        let err = RefineConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn disabled_task_log_opens_nothing() {
        assert!(TaskLogConfig::default().open().unwrap().is_none());
    }

    #[test]
    fn enabled_task_log_creates_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = TaskLogConfig {
            enabled: true,
            database: dir.path().join("refine.db"),
            create_table: true,
        };
        let store = config.open().unwrap().unwrap();
        assert!(store.has_table().unwrap());
    }

    #[test]
    fn missing_table_without_create_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let config = TaskLogConfig {
            enabled: true,
            database: dir.path().join("refine.db"),
            create_table: false,
        };
        assert!(config.open().unwrap().is_none());
    }
}
