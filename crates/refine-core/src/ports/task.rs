//! TaskDefinition port - 実行可能なタスク
//!
//! dispatcher はタスクが何をするかを知りません。
//! 記述子（公開操作の一覧）を読み、init と invoke を呼ぶだけです。

use async_trait::async_trait;

use crate::domain::{TaskDescriptor, TaskError};

/// A loaded task definition.
///
/// # 使用例
/// ```ignore
/// struct Cleanup { descriptor: TaskDescriptor }
///
/// #[async_trait]
/// impl TaskDefinition for Cleanup {
///     fn descriptor(&self) -> &TaskDescriptor { &self.descriptor }
///
///     async fn invoke(&self, method: &str, args: &[String]) -> Result<Option<String>, TaskError> {
///         Ok(Some(format!("{method} {args:?}")))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskDefinition: Send + Sync {
    fn descriptor(&self) -> &TaskDescriptor;

    /// Initialisation hook, run once before the main operation when
    /// `descriptor().has_init()` is set.
    async fn init(&self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Run one public operation with the pass-through arguments.
    ///
    /// A returned `Some(text)` is shown to the user.
    async fn invoke(&self, method: &str, args: &[String]) -> Result<Option<String>, TaskError>;
}
