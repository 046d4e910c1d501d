//! Retry queue and escalation policy.

use chrono::{DateTime, Utc};

use crate::core::state::{RetryEntry, WorkflowState};
use crate::core::types::{Escalation, TaskStatus};
use crate::error::StateError;

/// Attempt number from which a pushed retry blocks its task.
pub const BLOCK_AT_ATTEMPT: u32 = 3;

/// Escalation tier for an attempt number.
pub fn escalation_for(attempt: u32) -> Escalation {
    match attempt {
        0 | 1 => Escalation::Same,
        2 => Escalation::AlternateWorker,
        3 => Escalation::SpecialistWorker,
        _ => Escalation::Blocked,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushOutcome {
    pub entry: RetryEntry,
    pub queue_size: usize,
    pub task_blocked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopOutcome {
    pub entry: Option<RetryEntry>,
    pub remaining: usize,
    /// True when the popped entry moved its task back to `pending`.
    pub task_reset: bool,
}

/// Queue a retry for an existing task.
///
/// From [`BLOCK_AT_ATTEMPT`] on the task is forced to `blocked`, whatever its
/// current status.
pub fn push_retry(
    state: &mut WorkflowState,
    task_id: &str,
    attempt: u32,
    error: &str,
    now: DateTime<Utc>,
) -> Result<PushOutcome, StateError> {
    if attempt == 0 {
        return Err(StateError::InvalidInput(
            "attempt numbers start at 1".to_string(),
        ));
    }
    let task = state
        .task_mut(task_id)
        .ok_or_else(|| StateError::Reference {
            task_id: task_id.to_string(),
        })?;

    let task_blocked = attempt >= BLOCK_AT_ATTEMPT;
    if task_blocked {
        task.status = TaskStatus::Blocked;
    }

    let entry = RetryEntry {
        task_id: task_id.to_string(),
        attempt,
        error: error.to_string(),
        escalation: escalation_for(attempt),
        queued_at: now,
    };
    state.retry_queue.push(entry.clone());
    Ok(PushOutcome {
        entry,
        queue_size: state.retry_queue.len(),
        task_blocked,
    })
}

/// Remove the oldest entry and hand its task back to the scheduler.
///
/// Any task not `blocked` goes back to `pending`, including one still marked
/// `in_progress` by a worker that gave up. A `blocked` task stays blocked.
pub fn pop_retry(state: &mut WorkflowState) -> PopOutcome {
    if state.retry_queue.is_empty() {
        return PopOutcome {
            entry: None,
            remaining: 0,
            task_reset: false,
        };
    }
    let entry = state.retry_queue.remove(0);
    let task_reset = match state.task_mut(&entry.task_id) {
        Some(task) if task.status != TaskStatus::Blocked => {
            task.status = TaskStatus::Pending;
            true
        }
        _ => false,
    };
    PopOutcome {
        entry: Some(entry),
        remaining: state.retry_queue.len(),
        task_reset,
    }
}
