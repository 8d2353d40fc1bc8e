//! Task manifests: a task defined by a TOML file whose operations run
//! commands or print fixed text.
//!
//! ```toml
//! description = "Database migrations"
//!
//! [init]
//! command = "./bin/warmup"
//!
//! [methods.run]
//! command = "./bin/migrate"
//! args = ["--all"]
//!
//! [methods.help]
//! output = "Usage: refine migrate[:rollback]"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::CatalogError;
use crate::domain::{TaskDescriptor, TaskError};
use crate::ports::TaskDefinition;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskManifest {
    #[serde(default)]
    pub description: Option<String>,

    /// Initialisation hook.
    #[serde(default)]
    pub init: Option<Action>,

    /// Operations by name. Names starting with `_` are internal.
    #[serde(default)]
    pub methods: BTreeMap<String, Action>,
}

/// What an operation does.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAction")]
pub enum Action {
    /// Spawn `command` with `args`, then the pass-through arguments.
    /// Stdout becomes the return value.
    Command {
        command: String,
        args: Vec<String>,
    },

    /// Return fixed text.
    Output { output: String },
}

/// Action table as written; exactly one of `command` / `output` must be set.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    command: Option<String>,
    args: Option<Vec<String>>,
    output: Option<String>,
}

impl TryFrom<RawAction> for Action {
    type Error = String;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        match (raw.command, raw.output) {
            (Some(command), None) => Ok(Action::Command {
                command,
                args: raw.args.unwrap_or_default(),
            }),
            (None, Some(output)) if raw.args.is_none() => Ok(Action::Output { output }),
            (None, Some(_)) => Err("`args` needs a `command`".to_string()),
            (Some(_), Some(_)) => Err("an action has either `command` or `output`, not both".to_string()),
            (None, None) => Err("an action needs `command` or `output`".to_string()),
        }
    }
}

impl TaskManifest {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Action {
    async fn run(&self, task: &str, method: &str, extra: &[String]) -> Result<Option<String>, TaskError> {
        let (command, args) = match self {
            Action::Output { output } => return Ok(Some(output.clone())),
            Action::Command { command, args } => (command, args),
        };

        debug!(task, method, command = %command, "spawning task command");
        let output = Command::new(command)
            .args(args)
            .args(extra)
            .env("REFINE_TASK", task)
            .env("REFINE_METHOD", method)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TaskError::new(format!("failed to start '{command}': {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("'{command}' exited with {}", output.status)
            } else {
                format!("'{command}' exited with {}: {stderr}", output.status)
            };
            return Err(TaskError::new(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }
}

/// A task backed by a [`TaskManifest`].
#[derive(Debug, Clone)]
pub struct ManifestTask {
    descriptor: TaskDescriptor,
    manifest: TaskManifest,
}

impl ManifestTask {
    pub fn new(name: impl Into<String>, manifest: TaskManifest) -> Self {
        let mut descriptor = TaskDescriptor::new(name, manifest.methods.keys().cloned());
        if manifest.init.is_some() {
            descriptor = descriptor.with_init();
        }
        if let Some(description) = &manifest.description {
            descriptor = descriptor.with_description(description.clone());
        }
        Self {
            descriptor,
            manifest,
        }
    }

    /// Load `<dir>/<name>.toml`; the file stem is the task name.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| CatalogError::InvalidName(path.to_path_buf()))?;
        let manifest = TaskManifest::load(path)?;
        Ok(Self::new(name, manifest))
    }
}

#[async_trait]
impl TaskDefinition for ManifestTask {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    async fn init(&self) -> Result<(), TaskError> {
        match &self.manifest.init {
            Some(action) => {
                action.run(self.descriptor.name(), "_init", &[]).await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn invoke(&self, method: &str, args: &[String]) -> Result<Option<String>, TaskError> {
        let action = self
            .descriptor
            .is_callable(method)
            .then(|| self.manifest.methods.get(method))
            .flatten()
            .ok_or_else(|| TaskError::new(format!("no operation named '{method}'")))?;
        action.run(self.descriptor.name(), method, args).await
    }
}
