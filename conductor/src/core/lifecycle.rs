//! Task lifecycle transitions and append-only records.
//!
//! Each function applies one logical mutation to the in-memory record; callers
//! persist the result.

use chrono::{DateTime, Utc};

use crate::core::graph::TaskGraph;
use crate::core::state::{Checkpoint, Task, WorkflowState};
use crate::core::types::TaskStatus;
use crate::error::StateError;

pub const DEFAULT_FAILURE: &str = "Unknown error";

/// Input for [`add_task`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub id: String,
    pub name: String,
    pub agent: String,
    pub depends_on: Vec<String>,
    pub files: Vec<String>,
}

/// Append a task. Rejects empty or duplicate ids and dependency cycles.
pub fn add_task(state: &mut WorkflowState, new: NewTask) -> Result<&Task, StateError> {
    if new.id.trim().is_empty() {
        return Err(StateError::InvalidInput("task id must not be empty".to_string()));
    }
    if state.task(&new.id).is_some() {
        return Err(StateError::AlreadyExists(format!(
            "Task {} already exists",
            new.id
        )));
    }
    if new.depends_on.contains(&new.id) {
        return Err(StateError::Cycle { task_id: new.id });
    }

    let mut task = Task::new(new.id, new.name);
    task.agent = new.agent;
    task.depends_on = new.depends_on;
    task.files = new.files;
    state.tasks.push(task);

    // A forward reference from an earlier task can close a loop through the new one.
    if let Err(err) = TaskGraph::new(&state.tasks).ensure_acyclic() {
        state.tasks.pop();
        return Err(err);
    }
    Ok(&state.tasks[state.tasks.len() - 1])
}

pub fn start_task<'s>(
    state: &'s mut WorkflowState,
    id: &str,
    agent: Option<&str>,
    now: DateTime<Utc>,
) -> Result<&'s Task, StateError> {
    let i = transition(state, id, TaskStatus::InProgress)?;
    state.iteration += 1;
    let task = &mut state.tasks[i];
    task.started_at = Some(now);
    if let Some(agent) = agent.filter(|a| !a.is_empty()) {
        task.agent = agent.to_string();
    }
    Ok(task)
}

pub fn complete_task<'s>(
    state: &'s mut WorkflowState,
    id: &str,
    commit: Option<&str>,
    now: DateTime<Utc>,
) -> Result<&'s Task, StateError> {
    let i = transition(state, id, TaskStatus::Complete)?;
    let task = &mut state.tasks[i];
    task.completed_at = Some(now);
    if let Some(commit) = commit.filter(|c| !c.is_empty()) {
        task.commit = commit.to_string();
    }
    if let Some(started) = task.started_at {
        let elapsed_ms = (now - started).num_milliseconds().max(0);
        task.duration_s = elapsed_ms as f64 / 1000.0;
    }
    Ok(task)
}

pub fn fail_task<'s>(
    state: &'s mut WorkflowState,
    id: &str,
    error: Option<&str>,
) -> Result<&'s Task, StateError> {
    let i = transition(state, id, TaskStatus::Failed)?;
    let task = &mut state.tasks[i];
    task.retries += 1;
    task.last_error = Some(
        error
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_FAILURE)
            .to_string(),
    );
    Ok(task)
}

pub fn skip_task<'s>(state: &'s mut WorkflowState, id: &str) -> Result<&'s Task, StateError> {
    let i = transition(state, id, TaskStatus::Skipped)?;
    Ok(&state.tasks[i])
}

/// Append a checkpoint. A non-empty `task_id` must name an existing task.
pub fn record_checkpoint<'s>(
    state: &'s mut WorkflowState,
    commit: &str,
    task_id: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<&'s Checkpoint, StateError> {
    if commit.trim().is_empty() {
        return Err(StateError::InvalidInput("commit must not be empty".to_string()));
    }
    if !task_id.is_empty() && state.task(task_id).is_none() {
        return Err(StateError::Reference {
            task_id: task_id.to_string(),
        });
    }
    state.checkpoints.push(Checkpoint {
        commit: commit.to_string(),
        task_id: task_id.to_string(),
        message: message.to_string(),
        timestamp: now,
    });
    Ok(&state.checkpoints[state.checkpoints.len() - 1])
}

pub fn record_cost(state: &mut WorkflowState, input_tokens: u64, output_tokens: u64, cost_usd: f64) {
    let cost = &mut state.cost;
    cost.total_input_tokens = cost.total_input_tokens.saturating_add(input_tokens);
    cost.total_output_tokens = cost.total_output_tokens.saturating_add(output_tokens);
    cost.estimated_cost_usd += cost_usd;
}

/// Move task `id` to `next` if allowed; returns its position.
fn transition(state: &mut WorkflowState, id: &str, next: TaskStatus) -> Result<usize, StateError> {
    let i = state
        .tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| StateError::Reference {
            task_id: id.to_string(),
        })?;
    let task = &mut state.tasks[i];
    if !task.status.can_transition_to(next) {
        return Err(StateError::InvalidTransition {
            task_id: id.to_string(),
            from: task.status,
            to: next,
        });
    }
    task.status = next;
    Ok(i)
}
