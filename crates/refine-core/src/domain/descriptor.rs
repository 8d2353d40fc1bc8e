//! TaskDescriptor - タスクが公開する操作の一覧
//!
//! 実行時のリフレクションの代わりに、登録時に一度だけ作るプレーンなデータです。
//! resolver と help の両方がこれを参照します。

use serde::{Deserialize, Serialize};

/// Prefix marking an operation as internal (never callable from the CLI).
const INTERNAL_PREFIX: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    name: String,
    methods: Vec<String>,
    has_init: bool,
    description: Option<String>,
}

impl TaskDescriptor {
    /// The name is lowercased, matching how requests are parsed.
    /// Internal operations (`_`-prefixed) are dropped; order is kept.
    pub fn new<I, S>(name: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let methods = methods
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.starts_with(INTERNAL_PREFIX))
            .collect();
        Self {
            name: name.into().to_lowercase(),
            methods,
            has_init: false,
            description: None,
        }
    }

    pub fn with_init(mut self) -> Self {
        self.has_init = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Public operations in declaration order.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn has_init(&self) -> bool {
        self.has_init
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Exact, case-sensitive match against the public operations.
    pub fn is_callable(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}
