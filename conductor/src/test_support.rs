//! Test-only helpers for constructing tasks and workflow records.

use chrono::{DateTime, TimeZone, Utc};

use crate::core::lifecycle::NewTask;
use crate::core::state::{DEFAULT_MAX_ITERATIONS, Task, WorkflowState};

/// A fixed instant so timestamps in assertions are reproducible.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

/// Create a pending task with no dependencies or files.
pub fn task(id: &str) -> Task {
    Task::new(id, format!("{} task", id))
}

pub fn task_with_deps(id: &str, deps: &[&str]) -> Task {
    let mut task = task(id);
    task.depends_on = deps.iter().map(|dep| dep.to_string()).collect();
    task
}

pub fn task_with_files(id: &str, files: &[&str]) -> Task {
    let mut task = task(id);
    task.files = files.iter().map(|file| file.to_string()).collect();
    task
}

/// Wrap tasks in a fresh record stamped at [`fixed_now`].
pub fn state_with_tasks(tasks: Vec<Task>) -> WorkflowState {
    let mut state = WorkflowState::new("wf", "/tmp/project", DEFAULT_MAX_ITERATIONS, fixed_now());
    state.tasks = tasks;
    state
}

/// Input for `add_task` with the same naming as [`task`].
pub fn new_task(id: &str, deps: &[&str]) -> NewTask {
    NewTask {
        id: id.to_string(),
        name: format!("{} task", id),
        depends_on: deps.iter().map(|dep| dep.to_string()).collect(),
        ..NewTask::default()
    }
}
