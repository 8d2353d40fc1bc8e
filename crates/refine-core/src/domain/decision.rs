//! Lock decision: what to do with the latest task log entry for a key.
//!
//! Pure function of (latest entry, now, staleness threshold). Stores call it
//! inside their atomic acquire so the rule lives in one place.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::{RunStatus, TaskLogEntry, TaskLogId};

/// A `running` entry older than this is presumed abandoned.
pub const STALE_AFTER: Duration = Duration::from_secs(15 * 60);

/// Error message written to a reclaimed entry.
pub const TIMEOUT_MESSAGE: &str = "Timeout: Task was running over 15 minutes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDecision {
    /// No entry, or the latest one is terminal.
    Vacant,

    /// The latest entry is `running` but stale: mark it failed, then take the lock.
    Reclaim(TaskLogId),

    /// The latest entry is `running` and fresh.
    Held(TaskLogId),
}

impl LockDecision {
    pub fn is_available(self) -> bool {
        !matches!(self, LockDecision::Held(_))
    }
}

/// Decide on the latest entry for a lock key.
///
/// Stale means `created_at < now - stale_after` (strict).
pub fn decide(
    latest: Option<&TaskLogEntry>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> LockDecision {
    let Some(entry) = latest else {
        return LockDecision::Vacant;
    };

    if entry.status != RunStatus::Running {
        return LockDecision::Vacant;
    }

    let threshold = TimeDelta::from_std(stale_after).unwrap_or(TimeDelta::MAX);
    if now.signed_duration_since(entry.created_at) > threshold {
        LockDecision::Reclaim(entry.id)
    } else {
        LockDecision::Held(entry.id)
    }
}
