//! FsCatalog - ディレクトリを走査して TaskRegistry を作る
//!
//! - タスクディレクトリ 1 つ = app location 1 つ（設定順）
//! - モジュールディレクトリ直下の `<module>/tasks/` = モジュール
//! - ファイルはファイル名順に列挙（`*.toml` のみ）
//! - 読めないマニフェストは warn を出してスキップ

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::ManifestTask;
use crate::domain::RegistryError;
use crate::registry::{Location, TaskRegistry};

const MANIFEST_EXTENSION: &str = "toml";
const MODULE_TASKS_DIR: &str = "tasks";

#[derive(Debug, Clone, Default)]
pub struct FsCatalog {
    task_dirs: Vec<PathBuf>,
    module_dirs: Vec<PathBuf>,
}

impl FsCatalog {
    pub fn new(task_dirs: Vec<PathBuf>, module_dirs: Vec<PathBuf>) -> Self {
        Self {
            task_dirs,
            module_dirs,
        }
    }

    /// Build the registry. Missing directories and broken manifests are skipped.
    pub fn discover(&self) -> Result<TaskRegistry, RegistryError> {
        let mut registry = TaskRegistry::new();

        for dir in &self.task_dirs {
            registry.add_location(load_location(dir.display().to_string(), dir)?);
        }

        for dir in &self.module_dirs {
            for module_dir in sorted_entries(dir).into_iter().filter(|p| p.is_dir()) {
                let tasks_dir = module_dir.join(MODULE_TASKS_DIR);
                let Some(name) = module_dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if !tasks_dir.is_dir() {
                    debug!(module = name, "module has no tasks directory");
                    continue;
                }
                if registry.has_module(&name.to_lowercase()) {
                    debug!(module = name, path = %module_dir.display(), "module shadowed by an earlier module path");
                    continue;
                }
                let location = load_location(tasks_dir.display().to_string(), &tasks_dir)?;
                registry.add_module(name, location)?;
            }
        }

        Ok(registry)
    }
}

fn load_location(label: String, dir: &Path) -> Result<Location, RegistryError> {
    let mut location = Location::new(label);
    let manifests = sorted_entries(dir).into_iter().filter(|p| {
        p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
    });

    for path in manifests {
        match ManifestTask::load(&path) {
            Ok(task) => location.register(Arc::new(task))?,
            Err(e) => warn!(error = %e, "skipping task manifest"),
        }
    }
    Ok(location)
}

/// Directory entries in file-name order; empty if the directory is unreadable.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "task directory does not exist");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot read task directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::app::help;
    use crate::app::Resolver;
    use crate::domain::{ParsedRequest, TaskIdentifier};

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn discovers_app_and_module_tasks() {
        let root = tempfile::tempdir().unwrap();
        let tasks = root.path().join("tasks");
        let modules = root.path().join("modules");
        write(&tasks.join("seed.toml"), "[methods.run]\noutput = \"ok\"");
        write(&tasks.join("migrate.toml"), "[methods.run]\noutput = \"ok\"\n[methods.rollback]\noutput = \"ok\"");
        write(&tasks.join("README.md"), "not a task");
        write(&modules.join("blog/tasks/publish.toml"), "[methods.run]\noutput = \"ok\"");
        fs::create_dir_all(modules.join("empty")).unwrap();

        let registry = FsCatalog::new(vec![tasks], vec![modules]).discover().unwrap();

        let app = &registry.locations()[0];
        let names: Vec<_> = app.tasks().iter().map(|t| t.descriptor().name()).collect();
        assert_eq!(names, ["migrate", "seed"]);

        assert!(registry.has_module("blog"));
        assert!(!registry.has_module("empty"));
        let scope = registry.scope(Some("blog")).unwrap();
        assert!(scope.find("publish").is_some());
    }

    #[test]
    fn broken_manifest_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let tasks = root.path().join("tasks");
        write(&tasks.join("good.toml"), "[methods.run]\noutput = \"ok\"");
        write(&tasks.join("bad.toml"), "[methods.run");

        let registry = FsCatalog::new(vec![tasks], vec![]).discover().unwrap();
        let names: Vec<_> = registry.scope(None).unwrap().names().collect();
        assert_eq!(names, ["good"]);
    }

    #[test]
    fn missing_directories_yield_empty_locations() {
        let root = tempfile::tempdir().unwrap();
        let registry = FsCatalog::new(
            vec![root.path().join("nope")],
            vec![root.path().join("nothing")],
        )
        .discover()
        .unwrap();

        assert_eq!(registry.locations().len(), 1);
        assert!(registry.locations()[0].is_empty());
        assert_eq!(registry.modules().count(), 0);
    }

    #[test]
    fn earlier_module_path_wins() {
        let root = tempfile::tempdir().unwrap();
        let first = root.path().join("first");
        let second = root.path().join("second");
        write(&first.join("blog/tasks/publish.toml"), "[methods.run]\noutput = \"first\"");
        write(&second.join("blog/tasks/archive.toml"), "[methods.run]\noutput = \"second\"");

        let registry = FsCatalog::new(vec![], vec![first, second]).discover().unwrap();
        let blog = registry.module("blog").unwrap();
        assert!(blog.get("publish").is_some());
        assert!(blog.get("archive").is_none());
    }

    #[test]
    fn mixed_case_file_names_are_listed_as_they_resolve() {
        let root = tempfile::tempdir().unwrap();
        let tasks = root.path().join("tasks");
        let modules = root.path().join("modules");
        write(&tasks.join("Migrate.toml"), "[methods.run]\noutput = \"ok\"\n[methods.RollBack]\noutput = \"ok\"");
        write(&modules.join("Blog/tasks/PublishAll.toml"), "[methods.run]\noutput = \"ok\"");

        let registry = FsCatalog::new(vec![tasks], vec![modules]).discover().unwrap();
        let listings = help::discover(&registry);
        let names: Vec<_> = listings.iter().map(|l| l.task.as_str()).collect();
        assert_eq!(names, ["migrate", "blog::publishall"]);

        let resolver = Resolver::new(&registry);
        for listing in &listings {
            for method in &listing.methods {
                let raw = format!("{}:{method}", listing.task);
                let ParsedRequest::Task(id) = TaskIdentifier::parse(&raw) else {
                    panic!("{raw} parsed as help");
                };
                let resolved = resolver.resolve(&id).unwrap();
                assert!(resolved.task.descriptor().is_callable(method), "{raw}");
            }
        }
    }
}
