//! Persisted workflow record (`.conductor/state.json`).
//!
//! Every collection is an order-preserving sequence with an explicit id field.
//! Missing fields fall back to defaults and unknown fields are ignored, so older
//! and newer writers can share a file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::{Escalation, TaskStatus};

/// Current schema version written by this crate.
pub const SCHEMA_VERSION: &str = "2.0";
/// Stage tag of a freshly initialized workflow.
pub const INITIAL_STAGE: &str = "init";
/// Stage tag set once a supervising session activates.
pub const BUILDING_STAGE: &str = "building";
pub const DEFAULT_MAX_ITERATIONS: u32 = 30;

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Opaque worker label supplied by the caller.
    #[serde(default)]
    pub agent: String,
    /// Seconds between `started_at` and `completed_at`.
    #[serde(default)]
    pub duration_s: f64,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: TaskStatus::Pending,
            agent: String::new(),
            duration_s: 0.0,
            retries: 0,
            commit: String::new(),
            depends_on: Vec::new(),
            files: Vec::new(),
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }
}

/// One queued retry attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryEntry {
    pub task_id: String,
    /// 1-based attempt number.
    pub attempt: u32,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub escalation: Escalation,
    #[serde(default = "Utc::now")]
    pub queued_at: DateTime<Utc>,
}

/// Append-only record of a durable commit boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub commit: String,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Liveness of the supervising session.
///
/// Timestamps are integer epoch milliseconds; external liveness checks compare
/// them numerically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub active: bool,
    pub session_id: String,
    #[serde(alias = "story_id")]
    pub workflow_id: String,
    pub activated_at: Option<i64>,
    pub last_activity: Option<i64>,
}

/// Token usage and spend accumulated across the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTracker {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Aggregate root; the only record the state store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    pub version: String,
    #[serde(alias = "story_id")]
    pub workflow_id: String,
    pub project_path: String,
    pub stage: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
    pub retry_queue: Vec<RetryEntry>,
    pub checkpoints: Vec<Checkpoint>,
    pub session: SessionRecord,
    pub cost: CostTracker,
    pub iteration: u32,
    pub max_iterations: u32,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new("", "", DEFAULT_MAX_ITERATIONS, Utc::now())
    }
}

impl WorkflowState {
    pub fn new(
        workflow_id: impl Into<String>,
        project_path: impl Into<String>,
        max_iterations: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            workflow_id: workflow_id.into(),
            project_path: project_path.into(),
            stage: INITIAL_STAGE.to_string(),
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
            retry_queue: Vec::new(),
            checkpoints: Vec::new(),
            session: SessionRecord::default(),
            cost: CostTracker::default(),
            iteration: 0,
            max_iterations,
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|task| task.status == status).count()
    }
}
