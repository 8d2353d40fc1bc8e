//! Domain model (identifiers, descriptors, log entries, lock decisions, errors).

pub mod identifier;
pub mod descriptor;
pub mod state;
pub mod entry;
pub mod decision;
pub mod errors;

pub use self::identifier::{ParsedRequest, TaskIdentifier, DEFAULT_METHOD, HELP_KEYWORD};
pub use self::descriptor::TaskDescriptor;
pub use self::state::RunStatus;
pub use self::entry::{DispatchContext, LockKey, TaskLogEntry, TaskLogId};
pub use self::decision::{decide, LockDecision, STALE_AFTER, TIMEOUT_MESSAGE};
pub use self::errors::{RefineError, RegistryError, TaskError};
