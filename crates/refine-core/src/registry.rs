//! TaskRegistry - タスク定義の登録と検索
//!
//! 起動時に一度だけ構築し、実行中は読み取り専用で使います。
//! resolver と help は同じレジストリを見るので、
//! 一覧に出るタスクと解決できるタスクは必ず一致します。
//!
//! # 構造
//! - app locations: 設定順に並んだ検索パス（先に見つかった方が勝つ）
//! - modules: 名前付きの location。`module::task` のときだけ検索対象になる

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::RegistryError;
use crate::ports::TaskDefinition;

/// Label of the location created by [`TaskRegistry::register`].
pub const DEFAULT_LOCATION: &str = "app";

/// One search location: an ordered set of uniquely named tasks.
pub struct Location {
    label: String,
    tasks: Vec<Arc<dyn TaskDefinition>>,
}

impl Location {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tasks: Vec::new(),
        }
    }

    pub fn register(&mut self, task: Arc<dyn TaskDefinition>) -> Result<(), RegistryError> {
        let name = task.descriptor().name();
        if self.get(name).is_some() {
            return Err(RegistryError::AlreadyRegistered {
                task: name.to_string(),
                location: self.label.clone(),
            });
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, task: Arc<dyn TaskDefinition>) -> Result<Self, RegistryError> {
        self.register(task)?;
        Ok(self)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TaskDefinition>> {
        self.tasks.iter().find(|t| t.descriptor().name() == name)
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> &[Arc<dyn TaskDefinition>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    locations: Vec<Location>,
    modules: BTreeMap<String, Location>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an app search location.
    pub fn add_location(&mut self, location: Location) {
        self.locations.push(location);
    }

    /// Register a module. Names are stored lowercased, matching parsed identifiers.
    pub fn add_module(&mut self, name: &str, location: Location) -> Result<(), RegistryError> {
        let name = name.to_lowercase();
        if self.modules.contains_key(&name) {
            return Err(RegistryError::DuplicateModule(name));
        }
        self.modules.insert(name, location);
        Ok(())
    }

    /// Register a task in the first app location, creating it if needed.
    pub fn register(&mut self, task: Arc<dyn TaskDefinition>) -> Result<(), RegistryError> {
        if self.locations.is_empty() {
            self.locations.push(Location::new(DEFAULT_LOCATION));
        }
        self.locations[0].register(task)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn module(&self, name: &str) -> Option<&Location> {
        self.modules.get(name)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &Location)> {
        self.modules.iter().map(|(name, loc)| (name.as_str(), loc))
    }

    /// Search scope for a request: the module's location first (when given),
    /// then the app locations. `None` if the module is unknown.
    pub fn scope(&self, module: Option<&str>) -> Option<Scope<'_>> {
        let mut locations = Vec::with_capacity(self.locations.len() + 1);
        if let Some(module) = module {
            locations.push(self.modules.get(module)?);
        }
        locations.extend(self.locations.iter());
        Some(Scope { locations })
    }
}

/// Ordered view over the locations searched for one request.
pub struct Scope<'a> {
    locations: Vec<&'a Location>,
}

impl<'a> Scope<'a> {
    /// First task named `name`, in location order.
    pub fn find(&self, name: &str) -> Option<&'a Arc<dyn TaskDefinition>> {
        self.locations.iter().copied().find_map(|loc| loc.get(name))
    }

    /// Every task name in the scope, in search order (duplicates included).
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.locations
            .iter()
            .copied()
            .flat_map(|loc| loc.tasks().iter().map(|t| t.descriptor().name()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticTask;
    use super::*;

    #[test]
    fn duplicate_task_in_one_location_is_rejected() {
        let mut registry = TaskRegistry::new();
        registry.register(StaticTask::arc("migrate", &["run"])).unwrap();
        let err = registry.register(StaticTask::arc("migrate", &["run"])).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { ref task, .. } if task == "migrate"));
    }

    #[test]
    fn same_name_in_two_locations_first_wins() {
        let mut registry = TaskRegistry::new();
        registry.add_location(Location::new("app").with(StaticTask::arc("seed", &["run"])).unwrap());
        registry.add_location(
            Location::new("vendor").with(StaticTask::arc("seed", &["run", "all"])).unwrap(),
        );

        let scope = registry.scope(None).unwrap();
        let found = scope.find("seed").unwrap();
        assert_eq!(found.descriptor().methods(), ["run"]);
        assert_eq!(scope.names().collect::<Vec<_>>(), ["seed", "seed"]);
    }

    #[test]
    fn module_scope_searches_module_first() {
        let mut registry = TaskRegistry::new();
        registry.register(StaticTask::arc("publish", &["run"])).unwrap();
        registry
            .add_module(
                "Blog",
                Location::new("blog").with(StaticTask::arc("publish", &["run", "draft"])).unwrap(),
            )
            .unwrap();

        assert!(registry.has_module("blog"));
        let scope = registry.scope(Some("blog")).unwrap();
        assert_eq!(scope.find("publish").unwrap().descriptor().methods(), ["run", "draft"]);

        let app = registry.scope(None).unwrap();
        assert_eq!(app.find("publish").unwrap().descriptor().methods(), ["run"]);
    }

    #[test]
    fn unknown_module_has_no_scope() {
        let registry = TaskRegistry::new();
        assert!(registry.scope(Some("shop")).is_none());
    }

    #[test]
    fn duplicate_module_is_rejected() {
        let mut registry = TaskRegistry::new();
        registry.add_module("blog", Location::new("a")).unwrap();
        let err = registry.add_module("BLOG", Location::new("b")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModule(ref m) if m == "blog"));
    }
}
