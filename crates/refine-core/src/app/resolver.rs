//! Resolver - タスク識別子からタスク定義を引く
//!
//! # フロー
//! 1. モジュール指定があればその location を検索範囲に加える（無ければ ModuleNotFound）
//! 2. 検索範囲から名前が一致する最初のタスクを返す
//! 3. 見つからなければ全候補との編集距離を計算して "did you mean" を作る

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{RefineError, TaskIdentifier};
use crate::ports::TaskDefinition;
use crate::registry::TaskRegistry;

/// Suggestions farther than this are not offered.
pub const SUGGESTION_MAX_DISTANCE: usize = 5;

/// A task found for an identifier.
#[derive(Clone)]
pub struct ResolvedTask {
    pub identifier: TaskIdentifier,
    pub task: Arc<dyn TaskDefinition>,
}

impl fmt::Debug for ResolvedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTask")
            .field("identifier", &self.identifier)
            .field("task", &self.task.descriptor().name())
            .finish()
    }
}

impl ResolvedTask {
    /// Task name used in the lock key and in messages.
    pub fn qualified_name(&self) -> String {
        self.identifier.qualified_task()
    }
}

pub struct Resolver<'a> {
    registry: &'a TaskRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, identifier: &TaskIdentifier) -> Result<ResolvedTask, RefineError> {
        let module = identifier.module.as_deref();
        let scope = self
            .registry
            .scope(module)
            .ok_or_else(|| RefineError::ModuleNotFound(module.unwrap_or_default().to_string()))?;

        if let Some(task) = scope.find(&identifier.task) {
            debug!(task = %identifier.qualified_task(), method = %identifier.method, "resolved task");
            return Ok(ResolvedTask {
                identifier: identifier.clone(),
                task: Arc::clone(task),
            });
        }

        let task = identifier.task.clone();
        Err(match suggest(&identifier.task, scope.names()) {
            Some(suggestion) => RefineError::TaskNotFoundWithSuggestion {
                task,
                suggestion: suggestion.to_string(),
            },
            None => RefineError::TaskNotFound { task },
        })
    }
}

/// Nearest candidate by edit distance, if within [`SUGGESTION_MAX_DISTANCE`].
///
/// Ties go to the candidate enumerated first.
pub fn suggest<'c>(requested: &str, candidates: impl IntoIterator<Item = &'c str>) -> Option<&'c str> {
    let mut best: Option<(usize, &'c str)> = None;
    for candidate in candidates {
        let distance = levenshtein(candidate, requested);
        if best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    }
    best.filter(|(d, _)| *d <= SUGGESTION_MAX_DISTANCE)
        .map(|(_, candidate)| candidate)
}

/// Levenshtein distance over chars (unit cost insert/delete/substitute).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
