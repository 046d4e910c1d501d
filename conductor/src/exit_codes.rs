//! Stable exit codes for conductor CLI commands.

use crate::error::StateError;

/// Command succeeded.
pub const OK: i32 = 0;
/// Usage errors, invalid configuration and anything not covered below.
pub const FAILURE: i32 = 1;
/// No workflow state under the project root.
pub const NOT_FOUND: i32 = 2;
/// `init` without `--force`, or a duplicate task id.
pub const ALREADY_EXISTS: i32 = 3;
/// State file exists but cannot be parsed.
pub const CORRUPT: i32 = 4;
/// Another writer held the lock past the timeout.
pub const LOCK_TIMEOUT: i32 = 5;
/// Unknown task id.
pub const REFERENCE: i32 = 6;
pub const CYCLE: i32 = 7;
pub const INVALID_TRANSITION: i32 = 8;
/// `validate` found invariant violations.
pub const INVALID_STATE: i32 = 9;

pub fn for_error(err: &StateError) -> i32 {
    match err {
        StateError::NotFound { .. } => NOT_FOUND,
        StateError::AlreadyExists(_) => ALREADY_EXISTS,
        StateError::Corrupt { .. } => CORRUPT,
        StateError::LockTimeout { .. } => LOCK_TIMEOUT,
        StateError::Reference { .. } => REFERENCE,
        StateError::Cycle { .. } => CYCLE,
        StateError::InvalidTransition { .. } => INVALID_TRANSITION,
        StateError::Invariants(_) => INVALID_STATE,
        StateError::InvalidInput(_) | StateError::Io { .. } => FAILURE,
    }
}
