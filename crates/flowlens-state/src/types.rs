//! Record types read from the workflow store.
//!
//! These are the fixed row schemas the store hands out: DAG definitions,
//! DAG runs, task instances, task failures, and XCom values. All types are
//! JSON-serializable so a whole store can be captured in a [`Snapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a DAG.
pub type DagId = String;

/// Identifier of a task within a DAG.
pub type TaskId = String;

// ── DAG definitions ───────────────────────────────────────────────

/// A loaded DAG and its task topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DagInfo {
    pub dag_id: DagId,
    #[serde(default)]
    pub owners: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub tasks: Vec<TaskInfo>,
}

impl DagInfo {
    /// Active and not paused: the DAGs the aggregate statistics cover.
    pub fn is_live(&self) -> bool {
        self.is_active && !self.is_paused
    }
}

/// A task definition inside a DAG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInfo {
    pub task_id: TaskId,
    /// Operator class name (e.g. `BashOperator`).
    pub operator: String,
    /// Task ids that run after this one.
    #[serde(default)]
    pub downstream: Vec<TaskId>,
}

fn default_true() -> bool {
    true
}

// ── Run history ───────────────────────────────────────────────────

/// One run of a DAG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DagRunRecord {
    pub dag_id: DagId,
    pub execution_date: DateTime<Utc>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Raw state token as stored; see [`crate::to_processing_state`].
    #[serde(default)]
    pub state: Option<String>,
}

/// One execution of a task within a DAG run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInstanceRecord {
    pub dag_id: DagId,
    pub task_id: TaskId,
    #[serde(default)]
    pub operator: String,
    pub execution_date: DateTime<Utc>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub max_tries: u32,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default)]
    pub queued_at: Option<DateTime<Utc>>,
}

fn default_queue() -> String {
    "default".to_string()
}

/// A recorded task failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskFailRecord {
    pub dag_id: DagId,
    pub task_id: TaskId,
    pub execution_date: DateTime<Utc>,
}

/// A value pushed by a task, already decoded from its storage format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XComRecord {
    pub dag_id: DagId,
    pub task_id: TaskId,
    pub execution_date: DateTime<Utc>,
    #[serde(default)]
    pub key: String,
    pub value: serde_json::Value,
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Every record of a store, as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub dags: Vec<DagInfo>,
    #[serde(default)]
    pub dag_runs: Vec<DagRunRecord>,
    #[serde(default)]
    pub task_instances: Vec<TaskInstanceRecord>,
    #[serde(default)]
    pub task_failures: Vec<TaskFailRecord>,
    #[serde(default)]
    pub xcoms: Vec<XComRecord>,
}
