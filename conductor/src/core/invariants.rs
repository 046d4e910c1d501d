//! Semantic invariants not enforced by deserialization.

use std::collections::HashSet;

use crate::core::graph::TaskGraph;
use crate::core::state::WorkflowState;

/// Check semantic invariants of a loaded record:
/// - No empty or duplicate task ids
/// - No task depends on itself, directly or transitively
/// - Retry entries reference existing tasks with 1-based attempts
/// - `max_iterations > 0`
pub fn validate_invariants(state: &WorkflowState) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (i, task) in state.tasks.iter().enumerate() {
        if task.id.trim().is_empty() {
            errors.push(format!("tasks[{}]: empty id", i));
        } else if !seen.insert(task.id.as_str()) {
            errors.push(format!("tasks[{}]: duplicate id '{}'", i, task.id));
        }
        if task.depends_on.iter().any(|dep| dep == &task.id) {
            errors.push(format!("{}: depends on itself", task.id));
        }
    }

    if let Err(err) = TaskGraph::new(&state.tasks).ensure_acyclic() {
        errors.push(err.to_string());
    }

    for (i, entry) in state.retry_queue.iter().enumerate() {
        if !seen.contains(entry.task_id.as_str()) {
            errors.push(format!(
                "retry_queue[{}]: unknown task '{}'",
                i, entry.task_id
            ));
        }
        if entry.attempt == 0 {
            errors.push(format!("retry_queue[{}]: attempt must be >= 1", i));
        }
    }

    if state.max_iterations == 0 {
        errors.push("max_iterations must be > 0".to_string());
    }

    errors
}
