//! Plain-text rendering of the dependency graph for `conductor visualize`.

use crate::core::graph::TaskGraph;
use crate::core::state::Task;
use crate::core::types::TaskStatus;
use crate::error::StateError;

const RULE_WIDTH: usize = 50;
const FILES_SHOWN: usize = 3;

fn icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Complete => "[x]",
        TaskStatus::InProgress => "[>]",
        TaskStatus::Pending => "[ ]",
        TaskStatus::Failed => "[!]",
        TaskStatus::Blocked => "[#]",
        TaskStatus::Skipped => "[-]",
    }
}

fn files_label(task: &Task) -> String {
    if task.files.is_empty() {
        return "-".to_string();
    }
    let mut label = task
        .files
        .iter()
        .take(FILES_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if task.files.len() > FILES_SHOWN {
        label.push_str(&format!(" (+{} more)", task.files.len() - FILES_SHOWN));
    }
    label
}

pub fn render_graph(tasks: &[Task]) -> Result<String, StateError> {
    let graph = TaskGraph::new(tasks);
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec!["Task Dependency Graph:".to_string(), rule.clone()];

    for task in tasks {
        let deps = if task.depends_on.is_empty() {
            "none".to_string()
        } else {
            task.depends_on.join(", ")
        };
        let agent = if task.agent.is_empty() { "-" } else { task.agent.as_str() };
        lines.push(format!("  {} {}: {}", icon(task.status), task.id, task.name));
        lines.push(format!(
            "      agent: {agent} | deps: {deps} | files: {}",
            files_label(task)
        ));
    }
    lines.push(rule);

    let ready = graph.ready();
    if !ready.is_empty() {
        lines.push(String::new());
        lines.push(format!("Ready to execute ({}):", ready.len()));
        for task in &ready {
            lines.push(format!("  > {}: {} [{}]", task.id, task.name, task.agent));
        }
    }

    let batches = graph.parallel_batches();
    if !batches.is_empty() {
        lines.push(String::new());
        lines.push(format!("Parallel batches ({}):", batches.len()));
        for (i, batch) in batches.iter().enumerate() {
            let ids: Vec<&str> = batch.iter().map(|t| t.id.as_str()).collect();
            lines.push(format!("  Batch {}: {}", i + 1, ids.join(", ")));
        }
    }

    let path = graph.critical_path()?;
    if !path.is_empty() {
        lines.push(String::new());
        lines.push(format!("Critical path ({} tasks):", path.len()));
        lines.push(format!("  {}", path.join(" -> ")));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{task, task_with_deps, task_with_files};

    #[test]
    fn renders_tasks_ready_list_batches_and_path() {
        let mut tasks = vec![
            task("1.1"),
            task_with_deps("1.2", &["1.1"]),
            task_with_files("2.1", &["a.rs", "b.rs", "c.rs", "d.rs"]),
        ];
        tasks[0].status = TaskStatus::Complete;
        let text = render_graph(&tasks).expect("render");

        assert!(text.contains("[x] 1.1: 1.1 task"));
        assert!(text.contains("deps: 1.1"));
        assert!(text.contains("files: a.rs, b.rs, c.rs (+1 more)"));
        assert!(text.contains("Ready to execute (2):"));
        assert!(text.contains("Batch 1: 1.2, 2.1"));
        assert!(text.contains("1.1 -> 1.2"));
    }

    #[test]
    fn empty_graph_renders_header_only() {
        let text = render_graph(&[]).expect("render");
        assert!(text.starts_with("Task Dependency Graph:"));
        assert!(!text.contains("Ready to execute"));
        assert!(!text.contains("Critical path"));
    }
}
