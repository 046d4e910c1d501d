//! Shared deterministic enums for workflow state.
//!
//! Serialized labels are part of the on-disk and stdout contract; renaming a
//! variant is a breaking change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    Failed,
    Blocked,
    Skipped,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Complete,
        TaskStatus::Failed,
        TaskStatus::Blocked,
        TaskStatus::Skipped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::Skipped => "skipped",
        }
    }

    /// Whether an operator-facing command may move a task from `self` to `next`.
    ///
    /// Retry resets and escalation to `blocked` bypass this check; they are
    /// applied by [`crate::core::retry`] directly.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::{Blocked, Complete, Failed, InProgress, Pending, Skipped};
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending | InProgress | Complete, Complete)
                | (Pending | InProgress | Failed, Failed)
                | (Pending, Skipped)
                | (Failed | Blocked, Pending)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let labels: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown status '{}' (expected one of {})", s, labels.join(", "))
            })
    }
}

/// Who should handle the next attempt of a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Escalation {
    /// Retry with the same worker.
    #[default]
    Same,
    /// Hand the task to a different general-purpose worker.
    AlternateWorker,
    /// Hand the task to a debugging specialist.
    SpecialistWorker,
    /// Stop retrying; an operator has to intervene.
    Blocked,
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Same => "same",
            Self::AlternateWorker => "alternate-worker",
            Self::SpecialistWorker => "specialist-worker",
            Self::Blocked => "blocked",
        })
    }
}
