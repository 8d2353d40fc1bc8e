//! Run status of a task log entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status column of the task log.
///
/// State transitions:
/// - (absent) -> Running
/// - Running -> Ok | Error (by the holder on completion)
/// - Running -> Error (by a later invocation when the entry is stale)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Ok,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Ok | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "ok" => Ok(RunStatus::Ok),
            "error" => Ok(RunStatus::Error),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_match_the_log_table() {
        for status in [RunStatus::Running, RunStatus::Ok, RunStatus::Error] {
            assert_eq!(status.as_str().parse::<RunStatus>(), Ok(status));
        }
        assert_eq!(serde_json::to_string(&RunStatus::Ok).unwrap(), "\"ok\"");
        assert!("done".parse::<RunStatus>().is_err());
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Ok.is_terminal());
        assert!(RunStatus::Error.is_terminal());
    }
}
