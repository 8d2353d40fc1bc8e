//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait はホスト環境（データベース、タスク定義、標準出力、時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! - task_log の正本は TaskLogStore（SQLite など）
//! - タスクの中身は TaskDefinition が知っている（dispatcher は呼ぶだけ）

pub mod clock;
pub mod console;
pub mod task;
pub mod task_log;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::console::{BufferConsole, Console, StdoutConsole};
pub use self::task::TaskDefinition;
pub use self::task_log::{AcquireResult, StoreError, TaskLogStore};
