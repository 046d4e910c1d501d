//! Workflow state machine and dependency scheduler CLI.
//!
//! Manages `.conductor/state.json` under a project root. Every invocation prints
//! exactly one JSON object on stdout; failures carry `success: false`, an error
//! message, a machine-readable `kind` and a stable exit code.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::debug;

use conductor::commands::{self, Workspace, parse_csv};
use conductor::core::lifecycle::NewTask;
use conductor::core::types::TaskStatus;
use conductor::error::StateError;
use conductor::{exit_codes, logging};

#[derive(Parser)]
#[command(
    name = "conductor",
    version,
    about = "Workflow state machine and dependency scheduler"
)]
struct Cli {
    /// Project root holding `.conductor/` (default: current directory).
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.conductor/state.json`.
    Init {
        /// Replace existing (or corrupt) state.
        #[arg(short, long)]
        force: bool,
        #[arg(long, visible_alias = "workflow-id")]
        story_id: Option<String>,
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Append a pending task.
    TaskAdd {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        agent: String,
        /// Comma-separated task ids.
        #[arg(long)]
        depends_on: Option<String>,
        /// Comma-separated paths the task touches.
        #[arg(long)]
        files: Option<String>,
    },
    TaskStart {
        #[arg(long)]
        id: String,
        #[arg(long)]
        agent: Option<String>,
    },
    TaskComplete {
        #[arg(long)]
        id: String,
        #[arg(long)]
        commit: Option<String>,
    },
    TaskFail {
        #[arg(long)]
        id: String,
        #[arg(long)]
        error: Option<String>,
    },
    TaskSkip {
        #[arg(long)]
        id: String,
    },
    TaskList {
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Pending tasks whose dependencies are all complete.
    ReadyTasks {
        /// Only a file-disjoint batch that can run at once.
        #[arg(long)]
        parallel: bool,
    },
    /// Successive file-disjoint batches covering every ready task.
    ParallelBatches,
    /// Longest dependency chain.
    CriticalPath,
    /// Text rendering of the dependency graph.
    Visualize,
    /// Check the record for invariant violations.
    Validate,
    RetryPush {
        #[arg(long)]
        id: String,
        #[arg(long)]
        error: String,
        /// 1-based attempt number.
        #[arg(long)]
        attempt: u32,
    },
    RetryPop,
    RetryList,
    /// Record a commit boundary.
    Checkpoint {
        #[arg(long)]
        commit: String,
        #[arg(long, default_value = "")]
        task_id: String,
        #[arg(long, default_value = "")]
        message: String,
    },
    Checkpoints {
        /// Only the most recent checkpoint.
        #[arg(long)]
        last: bool,
    },
    SessionActivate {
        #[arg(long)]
        session_id: String,
        #[arg(long, visible_alias = "workflow-id")]
        story_id: Option<String>,
    },
    SessionDeactivate,
    SessionStatus,
    SessionHeartbeat,
    /// Accumulate token usage and spend.
    CostRecord {
        #[arg(long, default_value_t = 0)]
        input_tokens: u64,
        #[arg(long, default_value_t = 0)]
        output_tokens: u64,
        #[arg(long, default_value_t = 0.0)]
        cost_usd: f64,
    },
    /// Full record plus summary statistics.
    Status,
    /// One-line progress bar.
    Progress,
}

fn main() {
    logging::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            emit(&json!({
                "success": false,
                "error": err.render().to_string().trim_end(),
                "kind": "usage",
            }));
            process::exit(exit_codes::FAILURE);
        }
    };

    let code = match run(cli) {
        Ok(value) => {
            emit(&value);
            exit_codes::OK
        }
        Err(err) => report(&err),
    };
    process::exit(code);
}

fn emit(value: &Value) {
    println!("{}", value);
}

/// Print the failure object and pick the exit code from the first typed error
/// in the chain.
fn report(err: &anyhow::Error) -> i32 {
    debug!(error = ?err, "command failed");
    let typed = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<StateError>());
    let (kind, code) = match typed {
        Some(state_err) => (state_err.kind(), exit_codes::for_error(state_err)),
        None => ("error", exit_codes::FAILURE),
    };
    emit(&json!({
        "success": false,
        "error": format!("{:#}", err),
        "kind": kind,
    }));
    code
}

fn run(cli: Cli) -> Result<Value> {
    let root = match cli.project {
        Some(path) => std::path::absolute(&path)
            .with_context(|| format!("resolve project path {}", path.display()))?,
        None => std::env::current_dir().context("read current directory")?,
    };
    let ws = Workspace::open(root)?;
    debug!(root = %ws.paths.root.display(), "workspace opened");

    match cli.command {
        Command::Init {
            force,
            story_id,
            max_iterations,
        } => commands::init(&ws, force, story_id.as_deref(), max_iterations),
        Command::TaskAdd {
            id,
            name,
            agent,
            depends_on,
            files,
        } => commands::task_add(
            &ws,
            NewTask {
                id,
                name,
                agent,
                depends_on: parse_csv(depends_on.as_deref()),
                files: parse_csv(files.as_deref()),
            },
        ),
        Command::TaskStart { id, agent } => commands::task_start(&ws, &id, agent.as_deref()),
        Command::TaskComplete { id, commit } => {
            commands::task_complete(&ws, &id, commit.as_deref())
        }
        Command::TaskFail { id, error } => commands::task_fail(&ws, &id, error.as_deref()),
        Command::TaskSkip { id } => commands::task_skip(&ws, &id),
        Command::TaskList { status } => commands::task_list(&ws, status),
        Command::ReadyTasks { parallel } => commands::ready_tasks(&ws, parallel),
        Command::ParallelBatches => commands::parallel_batches(&ws),
        Command::CriticalPath => commands::critical_path(&ws),
        Command::Visualize => commands::visualize(&ws),
        Command::Validate => commands::validate(&ws),
        Command::RetryPush { id, error, attempt } => {
            commands::retry_push(&ws, &id, &error, attempt)
        }
        Command::RetryPop => commands::retry_pop(&ws),
        Command::RetryList => commands::retry_list(&ws),
        Command::Checkpoint {
            commit,
            task_id,
            message,
        } => commands::checkpoint(&ws, &commit, &task_id, &message),
        Command::Checkpoints { last } => commands::checkpoints(&ws, last),
        Command::SessionActivate {
            session_id,
            story_id,
        } => commands::session_activate(&ws, &session_id, story_id.as_deref()),
        Command::SessionDeactivate => commands::session_deactivate(&ws),
        Command::SessionStatus => commands::session_status(&ws),
        Command::SessionHeartbeat => commands::session_heartbeat(&ws),
        Command::CostRecord {
            input_tokens,
            output_tokens,
            cost_usd,
        } => commands::cost_record(&ws, input_tokens, output_tokens, cost_usd),
        Command::Status => commands::status(&ws),
        Command::Progress => commands::progress(&ws),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_defaults() {
        let cli = Cli::parse_from(["conductor", "init"]);
        assert!(matches!(
            cli.command,
            Command::Init {
                force: false,
                story_id: None,
                max_iterations: None,
            }
        ));
        assert!(cli.project.is_none());
    }

    #[test]
    fn project_flag_is_global() {
        let cli = Cli::parse_from(["conductor", "ready-tasks", "--parallel", "-p", "/tmp/w"]);
        assert_eq!(cli.project, Some(PathBuf::from("/tmp/w")));
        assert!(matches!(cli.command, Command::ReadyTasks { parallel: true }));
    }

    #[test]
    fn task_list_parses_status_filter() {
        let cli = Cli::parse_from(["conductor", "task-list", "--status", "in_progress"]);
        assert!(matches!(
            cli.command,
            Command::TaskList {
                status: Some(TaskStatus::InProgress)
            }
        ));
        assert!(Cli::try_parse_from(["conductor", "task-list", "--status", "done"]).is_err());
    }

    #[test]
    fn retry_push_requires_attempt() {
        assert!(Cli::try_parse_from(["conductor", "retry-push", "--id", "1.1", "--error", "x"]).is_err());
        let cli = Cli::parse_from([
            "conductor", "retry-push", "--id", "1.1", "--error", "x", "--attempt", "2",
        ]);
        assert!(matches!(cli.command, Command::RetryPush { attempt: 2, .. }));
    }

    #[test]
    fn report_maps_typed_errors_to_exit_codes() {
        let err = anyhow::Error::new(StateError::Reference {
            task_id: "9.9".to_string(),
        })
        .context("task-start");
        assert_eq!(report(&err), exit_codes::REFERENCE);
        assert_eq!(report(&anyhow::anyhow!("plain")), exit_codes::FAILURE);
    }
}
