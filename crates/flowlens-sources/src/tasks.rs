//! Task state counts as a table.

use std::sync::Arc;

use flowlens_query::{MetricReader, QueryOutput, TabularResult, TimeRange};
use flowlens_state::WorkflowStore;
use flowlens_state::stats::task_state_info;
use serde_json::json;

use crate::dag_scope;

pub const SOURCE: &str = "task_states";

const COLUMNS: [&str; 10] = [
    "dag_id",
    "task_id",
    "operator_name",
    "owner",
    "state",
    "count",
    "avg_duration",
    "min_duration",
    "max_duration",
    "max_tries",
];

pub struct TaskStateReader {
    store: Arc<dyn WorkflowStore>,
}

impl TaskStateReader {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

impl MetricReader for TaskStateReader {
    fn read(&self, argument: &str, _range: &TimeRange) -> anyhow::Result<QueryOutput> {
        let scope = dag_scope(argument, SOURCE);
        let mut table = TabularResult::new(COLUMNS)?;
        for info in task_state_info(self.store.as_ref())? {
            if scope.is_some_and(|id| info.dag_id != id) {
                continue;
            }
            table.push_row(vec![
                json!(info.dag_id),
                json!(info.task_id),
                json!(info.operator_name),
                json!(info.owner),
                json!(info.state.as_str()),
                json!(info.count),
                json!(info.avg_duration),
                json!(info.min_duration),
                json!(info.max_duration),
                json!(info.max_tries),
            ])?;
        }
        Ok(table.into())
    }
}
