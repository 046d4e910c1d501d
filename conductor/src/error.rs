//! Typed failures for workflow state operations.
//!
//! Every variant is recovered by `main` into a structured failure result and a
//! stable exit code (see [`crate::exit_codes`]); none escapes as a crash.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::TaskStatus;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("No workflow state found at {path}. Run 'init' first.")]
    NotFound { path: PathBuf },

    #[error("{0}")]
    AlreadyExists(String),

    #[error("State file corrupt at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Timed out after {waited_ms}ms waiting for lock {path}")]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    #[error("Task {task_id} not found")]
    Reference { task_id: String },

    #[error("Dependency cycle through task {task_id}")]
    Cycle { task_id: String },

    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("invariant violations: {}", .0.join("; "))]
    Invariants(Vec<String>),

    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    /// Stable machine-readable label for the `kind` field of failure output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Corrupt { .. } => "corrupt",
            Self::LockTimeout { .. } => "lock_timeout",
            Self::Reference { .. } => "reference",
            Self::Cycle { .. } => "cycle",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidInput(_) => "invalid_input",
            Self::Invariants(_) => "invalid_state",
            Self::Io { .. } => "io",
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
