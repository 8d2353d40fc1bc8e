//! Task identifier parsing: `[module::]task[:method]`.

use std::fmt;

/// Keyword (and empty input) that shows the task listing.
pub const HELP_KEYWORD: &str = "help";

/// Method used when the identifier names none.
pub const DEFAULT_METHOD: &str = "run";

const MODULE_SEPARATOR: &str = "::";
const METHOD_SEPARATOR: char = ':';

/// A parsed task request.
///
/// Module and task are lowercased; the method keeps the caller's case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentifier {
    pub module: Option<String>,
    pub task: String,
    pub method: String,
}

/// Result of parsing the raw task argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRequest {
    /// Empty input or the help keyword.
    Help,
    Task(TaskIdentifier),
}

impl TaskIdentifier {
    pub fn new(module: Option<&str>, task: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            module: module.map(str::to_string),
            task: task.into(),
            method: method.into(),
        }
    }

    /// Parse a raw task string.
    ///
    /// ```
    /// use refine_core::domain::{ParsedRequest, TaskIdentifier};
    ///
    /// let parsed = TaskIdentifier::parse("Blog::Publish:now");
    /// assert_eq!(
    ///     parsed,
    ///     ParsedRequest::Task(TaskIdentifier::new(Some("blog"), "publish", "now"))
    /// );
    /// ```
    pub fn parse(raw: &str) -> ParsedRequest {
        let raw = raw.trim();
        if raw.is_empty() || raw.to_lowercase() == HELP_KEYWORD {
            return ParsedRequest::Help;
        }

        let (module, rest) = match raw.split_once(MODULE_SEPARATOR) {
            Some((module, rest)) => (Some(module.to_lowercase()), rest),
            None => (None, raw),
        };

        let (task, method) = match rest.split_once(METHOD_SEPARATOR) {
            Some((task, method)) => (task, method.to_string()),
            None => (rest, DEFAULT_METHOD.to_string()),
        };

        ParsedRequest::Task(Self {
            module,
            task: task.to_lowercase(),
            method,
        })
    }

    /// `module::task` for module tasks, `task` otherwise.
    pub fn qualified_task(&self) -> String {
        match &self.module {
            Some(module) => format!("{module}{MODULE_SEPARATOR}{}", self.task),
            None => self.task.clone(),
        }
    }
}

impl fmt::Display for TaskIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{METHOD_SEPARATOR}{}", self.qualified_task(), self.method)
    }
}
