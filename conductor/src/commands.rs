//! Command implementations behind the `conductor` CLI.
//!
//! Every mutating command runs one locked load-mutate-save cycle; queries load
//! without the lock and rely on atomic replace. Each returns the JSON object
//! printed on stdout.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::core::graph::TaskGraph;
use crate::core::invariants::validate_invariants;
use crate::core::lifecycle::{
    NewTask, add_task, complete_task, fail_task, record_checkpoint, record_cost, skip_task,
    start_task,
};
use crate::core::render::render_graph;
use crate::core::retry::{pop_retry, push_retry};
use crate::core::session::{self, epoch_ms};
use crate::core::state::{BUILDING_STAGE, Task, WorkflowState};
use crate::core::summary::{PROGRESS_BAR_WIDTH, progress_bar, summarize};
use crate::core::types::TaskStatus;
use crate::error::StateError;
use crate::io::config::{ConductorConfig, load_config, write_config};
use crate::io::lock::StateLock;
use crate::io::paths::StatePaths;
use crate::io::state_store::{InitOptions, init_state, load_state, save_state, try_load_state};

/// A project root plus its configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub paths: StatePaths,
    pub config: ConductorConfig,
}

impl Workspace {
    /// Resolve paths and load `config.toml`. A config that fails to parse or
    /// validate is [`StateError::InvalidInput`].
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StateError> {
        let paths = StatePaths::new(root);
        let config = load_config(&paths.config_path)
            .map_err(|err| StateError::InvalidInput(format!("{:#}", err)))?;
        Ok(Self { paths, config })
    }

    fn lock(&self) -> Result<StateLock, StateError> {
        StateLock::acquire(
            &self.paths.lock_path,
            self.config.lock_timeout(),
            self.config.lock_retry(),
        )
    }

    fn load(&self) -> Result<WorkflowState, StateError> {
        load_state(&self.paths.state_path)
    }

    fn save(&self, state: &mut WorkflowState) -> Result<(), StateError> {
        save_state(&self.paths.state_path, state, Utc::now())
    }

    fn not_found(&self) -> StateError {
        StateError::NotFound {
            path: self.paths.state_path.clone(),
        }
    }

    /// Run `apply` against the locked record; saves when it reports a change.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut WorkflowState) -> Result<(T, bool), StateError>,
    ) -> Result<T, StateError> {
        if !self.paths.state_dir.is_dir() {
            return Err(self.not_found());
        }
        let _lock = self.lock()?;
        let mut state = self.load()?;
        let (value, changed) = apply(&mut state)?;
        if changed {
            self.save(&mut state)?;
        }
        Ok(value)
    }

    fn ensure_state_dir(&self) -> Result<(), StateError> {
        fs::create_dir_all(&self.paths.state_dir)
            .map_err(|err| StateError::io(&self.paths.state_dir, err))
    }
}

/// Split a comma-separated flag value: trims entries, drops empties and
/// repeated values, keeps first-seen order.
pub fn parse_csv(raw: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.unwrap_or_default().split(',') {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

pub fn init(
    ws: &Workspace,
    force: bool,
    workflow_id: Option<&str>,
    max_iterations: Option<u32>,
) -> Result<Value> {
    let max_iterations = max_iterations.unwrap_or(ws.config.max_iterations_default);
    if max_iterations == 0 {
        return Err(StateError::InvalidInput("max-iterations must be > 0".to_string()).into());
    }
    ws.ensure_state_dir()?;
    let _lock = ws.lock()?;
    let options = InitOptions {
        force,
        workflow_id: workflow_id.unwrap_or_default().to_string(),
        max_iterations,
    };
    let state = init_state(&ws.paths, &options, Utc::now())?;
    if !ws.paths.config_path.exists() {
        write_config(&ws.paths.config_path, &ws.config)?;
    }
    Ok(json!({
        "success": true,
        "state_path": ws.paths.state_path.display().to_string(),
        "workflow_id": state.workflow_id,
        "max_iterations": state.max_iterations,
    }))
}

pub fn task_add(ws: &Workspace, new: NewTask) -> Result<Value> {
    let out = ws.mutate(|state| {
        let task = add_task(state, new)?;
        info!(task_id = %task.id, deps = task.depends_on.len(), "task added");
        Ok((json!({ "success": true, "task": task }), true))
    })?;
    Ok(out)
}

pub fn task_start(ws: &Workspace, id: &str, agent: Option<&str>) -> Result<Value> {
    let out = ws.mutate(|state| {
        let task = start_task(state, id, agent, Utc::now())?.clone();
        if state.iteration > state.max_iterations {
            warn!(
                iteration = state.iteration,
                max_iterations = state.max_iterations,
                "iteration budget exceeded"
            );
        }
        info!(task_id = %task.id, iteration = state.iteration, "task started");
        Ok((
            json!({
                "success": true,
                "task": task,
                "iteration": state.iteration,
                "max_iterations": state.max_iterations,
            }),
            true,
        ))
    })?;
    Ok(out)
}

pub fn task_complete(ws: &Workspace, id: &str, commit: Option<&str>) -> Result<Value> {
    let out = ws.mutate(|state| {
        let task = complete_task(state, id, commit, Utc::now())?.clone();
        info!(task_id = %task.id, duration_s = task.duration_s, "task complete");
        Ok((
            json!({ "success": true, "task": task, "summary": summarize(state) }),
            true,
        ))
    })?;
    Ok(out)
}

pub fn task_fail(ws: &Workspace, id: &str, error: Option<&str>) -> Result<Value> {
    let out = ws.mutate(|state| {
        let task = fail_task(state, id, error)?;
        info!(task_id = %task.id, retries = task.retries, "task failed");
        Ok((json!({ "success": true, "task": task }), true))
    })?;
    Ok(out)
}

pub fn task_skip(ws: &Workspace, id: &str) -> Result<Value> {
    let out = ws.mutate(|state| {
        let task = skip_task(state, id)?;
        Ok((json!({ "success": true, "task": task }), true))
    })?;
    Ok(out)
}

pub fn task_list(ws: &Workspace, status: Option<TaskStatus>) -> Result<Value> {
    let state = ws.load()?;
    let tasks: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|task| status.is_none_or(|wanted| task.status == wanted))
        .collect();
    Ok(json!({ "success": true, "tasks": tasks, "count": tasks.len() }))
}

pub fn ready_tasks(ws: &Workspace, parallel: bool) -> Result<Value> {
    let state = ws.load()?;
    let graph = TaskGraph::new(&state.tasks);
    let tasks = if parallel {
        graph.parallel_batch()
    } else {
        graph.ready()
    };
    Ok(json!({
        "success": true,
        "ready": tasks,
        "count": tasks.len(),
    }))
}

pub fn parallel_batches(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    let batches = TaskGraph::new(&state.tasks).parallel_batches();
    Ok(json!({ "success": true, "count": batches.len(), "batches": batches }))
}

pub fn critical_path(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    let path = TaskGraph::new(&state.tasks).critical_path()?;
    Ok(json!({ "success": true, "length": path.len(), "critical_path": path }))
}

pub fn visualize(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    let rendered = render_graph(&state.tasks)?;
    Ok(json!({ "success": true, "rendered": rendered }))
}

pub fn validate(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    let errors = validate_invariants(&state);
    if !errors.is_empty() {
        return Err(StateError::Invariants(errors).into());
    }
    Ok(json!({ "success": true, "valid": true, "tasks": state.tasks.len() }))
}

pub fn retry_push(ws: &Workspace, id: &str, error: &str, attempt: u32) -> Result<Value> {
    let out = ws.mutate(|state| {
        let outcome = push_retry(state, id, attempt, error, Utc::now())?;
        if outcome.task_blocked {
            warn!(task_id = %id, attempt, "task blocked by retry escalation");
        }
        Ok((
            json!({
                "success": true,
                "entry": outcome.entry,
                "queue_size": outcome.queue_size,
                "task_blocked": outcome.task_blocked,
            }),
            true,
        ))
    })?;
    Ok(out)
}

pub fn retry_pop(ws: &Workspace) -> Result<Value> {
    let out = ws.mutate(|state| {
        let outcome = pop_retry(state);
        let Some(entry) = outcome.entry else {
            return Ok((
                json!({
                    "success": true,
                    "entry": null,
                    "remaining": 0,
                    "task_reset": false,
                    "message": "Retry queue empty",
                }),
                false,
            ));
        };
        Ok((
            json!({
                "success": true,
                "entry": entry,
                "remaining": outcome.remaining,
                "task_reset": outcome.task_reset,
            }),
            true,
        ))
    })?;
    Ok(out)
}

pub fn retry_list(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    Ok(json!({
        "success": true,
        "queue": state.retry_queue,
        "count": state.retry_queue.len(),
    }))
}

pub fn checkpoint(ws: &Workspace, commit: &str, task_id: &str, message: &str) -> Result<Value> {
    let out = ws.mutate(|state| {
        let ckpt = record_checkpoint(state, commit, task_id, message, Utc::now())?.clone();
        info!(commit = %ckpt.commit, task_id = %ckpt.task_id, "checkpoint recorded");
        Ok((
            json!({
                "success": true,
                "checkpoint": ckpt,
                "total": state.checkpoints.len(),
            }),
            true,
        ))
    })?;
    Ok(out)
}

pub fn checkpoints(ws: &Workspace, last: bool) -> Result<Value> {
    let state = ws.load()?;
    if last {
        return Ok(json!({ "success": true, "checkpoint": state.checkpoints.last() }));
    }
    Ok(json!({
        "success": true,
        "checkpoints": state.checkpoints,
        "total": state.checkpoints.len(),
    }))
}

/// Activate a session, creating the workflow record on first use.
pub fn session_activate(ws: &Workspace, session_id: &str, workflow_id: Option<&str>) -> Result<Value> {
    ws.ensure_state_dir()?;
    let _lock = ws.lock()?;
    let now = Utc::now();
    let mut state = match try_load_state(&ws.paths.state_path)? {
        Some(state) => state,
        None => {
            info!(root = %ws.paths.root.display(), "no state yet, creating workflow");
            WorkflowState::new(
                workflow_id.unwrap_or_default(),
                ws.paths.root.display().to_string(),
                ws.config.max_iterations_default,
                now,
            )
        }
    };
    let workflow_id = workflow_id
        .filter(|id| !id.is_empty())
        .map_or_else(|| state.workflow_id.clone(), str::to_string);
    session::activate(&mut state.session, session_id, &workflow_id, epoch_ms(now));
    state.stage = BUILDING_STAGE.to_string();
    ws.save(&mut state)?;
    Ok(json!({ "success": true, "session": state.session }))
}

pub fn session_deactivate(ws: &Workspace) -> Result<Value> {
    let out = ws.mutate(|state| {
        let updated = session::deactivate(&mut state.session, epoch_ms(Utc::now()));
        Ok((
            json!({ "success": true, "updated": updated, "session": state.session }),
            updated,
        ))
    })?;
    Ok(out)
}

/// Read-only session snapshot. A missing record reports an inactive session.
pub fn session_status(ws: &Workspace) -> Result<Value> {
    let Some(state) = try_load_state(&ws.paths.state_path)? else {
        return Ok(json!({ "success": true, "active": false, "reason": "no state file" }));
    };
    let now_ms = epoch_ms(Utc::now());
    let stale = session::is_stale(&state.session, now_ms, ws.config.stale_after_ms());
    if stale {
        warn!(session_id = %state.session.session_id, "active session looks stale");
    }
    let mut out = serde_json::to_value(&state.session).context("serialize session")?;
    if let Value::Object(map) = &mut out {
        map.insert("success".to_string(), Value::Bool(true));
        map.insert(
            "idle_ms".to_string(),
            json!(session::idle_ms(&state.session, now_ms)),
        );
        map.insert("stale".to_string(), Value::Bool(stale));
    }
    Ok(out)
}

/// Refresh liveness. Reports `updated: false` without writing when there is
/// no record or no active session.
pub fn session_heartbeat(ws: &Workspace) -> Result<Value> {
    if !ws.paths.state_dir.is_dir() {
        return Ok(json!({ "success": true, "updated": false }));
    }
    let _lock = ws.lock()?;
    let Some(mut state) = try_load_state(&ws.paths.state_path)? else {
        return Ok(json!({ "success": true, "updated": false }));
    };
    let updated = session::heartbeat(&mut state.session, epoch_ms(Utc::now()));
    if updated {
        ws.save(&mut state)?;
    }
    Ok(json!({ "success": true, "updated": updated }))
}

pub fn cost_record(ws: &Workspace, input_tokens: u64, output_tokens: u64, cost_usd: f64) -> Result<Value> {
    if !cost_usd.is_finite() || cost_usd < 0.0 {
        return Err(StateError::InvalidInput(format!("cost-usd must be >= 0, got {cost_usd}")).into());
    }
    let out = ws.mutate(|state| {
        record_cost(state, input_tokens, output_tokens, cost_usd);
        Ok((json!({ "success": true, "cost": state.cost }), true))
    })?;
    Ok(out)
}

/// Full record plus summary statistics.
pub fn status(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    let mut out = serde_json::to_value(&state).context("serialize state")?;
    if let Value::Object(map) = &mut out {
        map.insert("success".to_string(), Value::Bool(true));
        map.insert(
            "summary".to_string(),
            serde_json::to_value(summarize(&state)).context("serialize summary")?,
        );
    }
    Ok(out)
}

pub fn progress(ws: &Workspace) -> Result<Value> {
    let state = ws.load()?;
    Ok(json!({
        "success": true,
        "progress": progress_bar(&state, PROGRESS_BAR_WIDTH, Utc::now()),
    }))
}
