//! Console port - ユーザー向けの行出力
//!
//! tracing のログとは別物です（ログは stderr、こちらはユーザーへの応答）。

use std::io::Write;
use std::sync::Mutex;

/// Line-oriented writer for user-facing messages.
pub trait Console: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Writes to stdout.
#[derive(Debug, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // closed stdout (`| head`) is ignored
        let _ = writeln!(out, "{line}");
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// All lines joined with `\n`.
    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }
}

impl Console for BufferConsole {
    fn write_line(&self, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(line.to_string());
    }
}
