//! Task listing for `help` and usage hints for unknown methods.

use std::collections::HashSet;

use crate::domain::DEFAULT_METHOD;
use crate::registry::TaskRegistry;

/// One reachable task and its public operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListing {
    /// `task` or `module::task`, as typed on the command line.
    pub task: String,
    pub methods: Vec<String>,
}

/// Every task the resolver can reach, in search order.
///
/// App tasks shadowed by an earlier location are listed once.
pub fn discover(registry: &TaskRegistry) -> Vec<TaskListing> {
    let mut listings = Vec::new();
    let mut seen = HashSet::new();

    for location in registry.locations() {
        for task in location.tasks() {
            let descriptor = task.descriptor();
            if seen.insert(descriptor.name().to_string()) {
                listings.push(TaskListing {
                    task: descriptor.name().to_string(),
                    methods: descriptor.methods().to_vec(),
                });
            }
        }
    }

    for (module, location) in registry.modules() {
        for task in location.tasks() {
            let descriptor = task.descriptor();
            listings.push(TaskListing {
                task: format!("{module}::{}", descriptor.name()),
                methods: descriptor.methods().to_vec(),
            });
        }
    }

    listings
}

/// Command line for one operation; `run` is implied.
pub fn invocation(program: &str, task: &str, method: &str) -> String {
    if method == DEFAULT_METHOD {
        format!("{program} {task}")
    } else {
        format!("{program} {task}:{method}")
    }
}

/// Full help text.
pub fn render(program: &str, listings: &[TaskListing]) -> String {
    let mut available = String::new();
    for listing in listings {
        for method in &listing.methods {
            available.push_str("    ");
            available.push_str(&invocation(program, &listing.task, method));
            available.push('\n');
        }
    }
    if available.is_empty() {
        available.push_str("    (none found)\n");
    }

    format!(
        "\nUsage:\n    {program} <taskname> [args...]\n\n\
         Description:\n    Tasks are named commands that can be run from the command line or set up as a cron job.\n\n\
         Available tasks:\n{available}"
    )
}

/// `Did you mean` lines for a task whose requested method does not exist.
pub fn method_hints(program: &str, task: &str, methods: &[String]) -> Vec<String> {
    methods
        .iter()
        .map(|method| format!("{program} {task}:{method}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::testing::StaticTask;
    use crate::registry::Location;

    fn registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        registry.add_location(
            Location::new("app")
                .with(StaticTask::arc("migrate", &["run", "rollback"]))
                .unwrap()
                .with(StaticTask::arc("seed", &["run"]))
                .unwrap(),
        );
        registry.add_location(
            Location::new("vendor")
                .with(StaticTask::arc("seed", &["run", "purge"]))
                .unwrap(),
        );
        registry
            .add_module("blog", Location::new("blog").with(StaticTask::arc("publish", &["run"])).unwrap())
            .unwrap();
        registry
    }

    #[test]
    fn discover_lists_app_then_modules_without_shadowed_tasks() {
        let listings = discover(&registry());
        let tasks: Vec<_> = listings.iter().map(|l| l.task.as_str()).collect();
        assert_eq!(tasks, ["migrate", "seed", "blog::publish"]);
        assert_eq!(listings[1].methods, ["run"]);
    }

    #[test]
    fn render_omits_default_method() {
        let text = render("refine", &discover(&registry()));
        assert!(text.contains("    refine migrate\n"));
        assert!(text.contains("    refine migrate:rollback\n"));
        assert!(text.contains("    refine blog::publish\n"));
        assert!(!text.contains("migrate:run"));
    }

    #[test]
    fn render_without_tasks() {
        let text = render("refine", &[]);
        assert!(text.contains("(none found)"));
    }

    #[test]
    fn hints_list_every_method() {
        let hints = method_hints("refine", "migrate", &["run".into(), "rollback".into()]);
        assert_eq!(hints, ["refine migrate:run", "refine migrate:rollback"]);
    }
}
