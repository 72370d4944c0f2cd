//! WorkflowStore: read-only access to workflow records.
//!
//! The query engine and the exporter only see the [`WorkflowStore`] trait.
//! [`MemoryStore`] serves an immutable [`Snapshot`] that is either built in
//! code (tests) or loaded once from a JSON file at start-up.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Read-only source of workflow records.
pub trait WorkflowStore: Send + Sync {
    fn dags(&self) -> StateResult<Vec<DagInfo>>;

    fn dag_runs(&self) -> StateResult<Vec<DagRunRecord>>;

    fn task_instances(&self) -> StateResult<Vec<TaskInstanceRecord>>;

    fn task_failures(&self) -> StateResult<Vec<TaskFailRecord>>;

    fn xcoms(&self) -> StateResult<Vec<XComRecord>>;

    /// Look up one DAG by id.
    fn dag(&self, dag_id: &str) -> StateResult<Option<DagInfo>> {
        Ok(self.dags()?.into_iter().find(|d| d.dag_id == dag_id))
    }
}

/// Snapshot-backed store. `Clone` is cheap (shared `Arc`).
#[derive(Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<Snapshot>,
}

impl MemoryStore {
    /// Serve the given snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn open(path: &Path) -> StateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(map_err!(Open))?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(map_err!(Deserialize))?;
        debug!(
            ?path,
            dags = snapshot.dags.len(),
            dag_runs = snapshot.dag_runs.len(),
            task_instances = snapshot.task_instances.len(),
            "snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl WorkflowStore for MemoryStore {
    fn dags(&self) -> StateResult<Vec<DagInfo>> {
        Ok(self.snapshot.dags.clone())
    }

    fn dag_runs(&self) -> StateResult<Vec<DagRunRecord>> {
        Ok(self.snapshot.dag_runs.clone())
    }

    fn task_instances(&self) -> StateResult<Vec<TaskInstanceRecord>> {
        Ok(self.snapshot.task_instances.clone())
    }

    fn task_failures(&self) -> StateResult<Vec<TaskFailRecord>> {
        Ok(self.snapshot.task_failures.clone())
    }

    fn xcoms(&self) -> StateResult<Vec<XComRecord>> {
        Ok(self.snapshot.xcoms.clone())
    }

    fn dag(&self, dag_id: &str) -> StateResult<Option<DagInfo>> {
        Ok(self.snapshot.dags.iter().find(|d| d.dag_id == dag_id).cloned())
    }
}
