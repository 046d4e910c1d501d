//! Aggregate statistics and the one-line progress bar.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::state::{Checkpoint, WorkflowState};
use crate::core::types::TaskStatus;

pub const PROGRESS_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub workflow_id: String,
    pub stage: String,
    pub iteration: u32,
    pub max_iterations: u32,
    pub total_tasks: usize,
    pub complete: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub blocked: usize,
    pub pending: usize,
    pub skipped: usize,
    /// Share of complete tasks, rounded to one decimal.
    pub progress_pct: f64,
    pub retry_queue_size: usize,
    pub checkpoints: usize,
    pub last_checkpoint: Option<Checkpoint>,
}

pub fn summarize(state: &WorkflowState) -> Summary {
    let total = state.tasks.len();
    let complete = state.count_status(TaskStatus::Complete);
    let progress_pct = if total == 0 {
        0.0
    } else {
        (complete as f64 / total as f64 * 1000.0).round() / 10.0
    };
    Summary {
        workflow_id: state.workflow_id.clone(),
        stage: state.stage.clone(),
        iteration: state.iteration,
        max_iterations: state.max_iterations,
        total_tasks: total,
        complete,
        in_progress: state.count_status(TaskStatus::InProgress),
        failed: state.count_status(TaskStatus::Failed),
        blocked: state.count_status(TaskStatus::Blocked),
        pending: state.count_status(TaskStatus::Pending),
        skipped: state.count_status(TaskStatus::Skipped),
        progress_pct,
        retry_queue_size: state.retry_queue.len(),
        checkpoints: state.checkpoints.len(),
        last_checkpoint: state.checkpoints.last().cloned(),
    }
}

/// `wf [=====---------------] 1/4 (25%) | retry: 1 | last commit: 3m ago`
pub fn progress_bar(state: &WorkflowState, width: usize, now: DateTime<Utc>) -> String {
    let total = state.tasks.len();
    let complete = state.count_status(TaskStatus::Complete);
    let (pct, filled) = if total == 0 {
        (0, 0)
    } else {
        (
            (complete as f64 / total as f64 * 100.0).round() as u64,
            width * complete / total,
        )
    };
    let bar = format!("{}{}", "=".repeat(filled), "-".repeat(width - filled));
    let label = if state.workflow_id.is_empty() {
        "workflow"
    } else {
        state.workflow_id.as_str()
    };

    let mut line = format!("{label} [{bar}] {complete}/{total} ({pct}%)");
    if !state.retry_queue.is_empty() {
        line.push_str(&format!(" | retry: {}", state.retry_queue.len()));
    }
    if let Some(last) = state.checkpoints.last() {
        let secs = (now - last.timestamp).num_seconds().max(0);
        if secs < 60 {
            line.push_str(&format!(" | last commit: {secs}s ago"));
        } else {
            line.push_str(&format!(" | last commit: {}m ago", secs / 60));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::core::lifecycle::record_checkpoint;
    use crate::test_support::{fixed_now, state_with_tasks, task};

    fn sample() -> WorkflowState {
        let mut state = state_with_tasks(vec![task("a"), task("b"), task("c")]);
        state.workflow_id = "STORY-1".to_string();
        state.tasks[0].status = TaskStatus::Complete;
        state.tasks[1].status = TaskStatus::Failed;
        state
    }

    #[test]
    fn summary_counts_each_status() {
        let summary = summarize(&sample());
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.complete, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.blocked, 0);
        assert!((summary.progress_pct - 33.3).abs() < 1e-9);
        assert!(summary.last_checkpoint.is_none());
    }

    #[test]
    fn summary_of_empty_workflow() {
        let summary = summarize(&state_with_tasks(Vec::new()));
        assert_eq!(summary.total_tasks, 0);
        assert!((summary.progress_pct - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_bar_format() {
        let mut state = sample();
        record_checkpoint(&mut state, "abc", "a", "done", fixed_now()).expect("ckpt");
        let line = progress_bar(&state, 20, fixed_now() + Duration::seconds(150));
        assert_eq!(
            line,
            "STORY-1 [======--------------] 1/3 (33%) | last commit: 2m ago"
        );
    }

    #[test]
    fn progress_bar_empty_workflow() {
        let state = state_with_tasks(Vec::new());
        let line = progress_bar(&state, 10, fixed_now());
        assert_eq!(line, "workflow [----------] 0/0 (0%)");
    }
}
