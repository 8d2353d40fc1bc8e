//! App - アプリケーション層
//!
//! ports を組み合わせてディスパッチのロジックを実装します。
//!
//! # 主要コンポーネント
//! - **Resolver**: 識別子 → タスク定義（近い名前の提案つき）
//! - **RunLockManager**: task_log によるロックと実行結果の記録
//! - **help**: タスク一覧と使い方のヒント
//! - **Dispatcher**: 1 回の呼び出しを最後まで処理する
//! - **AppBuilder**: Dispatcher の構築とワイヤリング

pub mod resolver;
pub mod lock;
pub mod help;
pub mod dispatcher;
pub mod builder;

pub use self::builder::AppBuilder;
pub use self::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher};
pub use self::lock::{LockOutcome, RunLock, RunLockManager};
pub use self::resolver::{ResolvedTask, Resolver};
