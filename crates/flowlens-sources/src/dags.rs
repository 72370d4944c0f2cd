//! DAG discovery and the DAG node graph.

use std::sync::Arc;

use flowlens_query::target::is_wildcard;
use flowlens_query::{
    MetricFinder, MetricReader, OutcomeMap, QueryOutput, RunOutcome, TimeRange, WorkUnit,
    build_node_graph,
};
use flowlens_state::WorkflowStore;
use flowlens_state::stats::latest_task_states_by_dag;
use tracing::debug;

use crate::dag_scope;

pub const SOURCE: &str = "dags";

/// Lists `dags` plus one `dags:<dag_id>` target per DAG. A non-wildcard
/// argument keeps only the DAG ids starting with it.
pub struct DagFinder {
    store: Arc<dyn WorkflowStore>,
}

impl DagFinder {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

impl MetricFinder for DagFinder {
    fn find(&self, argument: &str) -> anyhow::Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .store
            .dags()?
            .into_iter()
            .map(|d| d.dag_id)
            .filter(|id| is_wildcard(argument) || id.starts_with(argument))
            .collect();
        ids.sort();

        let mut targets = vec![SOURCE.to_string()];
        targets.extend(ids.into_iter().map(|id| format!("{SOURCE}:{id}")));
        Ok(targets)
    }
}

/// Node graph of the tasks of every DAG, or of one DAG.
pub struct DagGraphReader {
    store: Arc<dyn WorkflowStore>,
}

impl DagGraphReader {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

impl MetricReader for DagGraphReader {
    fn read(&self, argument: &str, _range: &TimeRange) -> anyhow::Result<QueryOutput> {
        let scope = dag_scope(argument, SOURCE);
        let mut dags = self.store.dags()?;
        dags.retain(|d| scope.is_none_or(|id| d.dag_id == id));
        dags.sort_by(|a, b| a.dag_id.cmp(&b.dag_id));

        let units: Vec<WorkUnit> = dags
            .iter()
            .flat_map(|dag| {
                dag.tasks.iter().map(|task| WorkUnit {
                    id: task.task_id.clone(),
                    collection: dag.dag_id.clone(),
                    title: task.task_id.clone(),
                    subtitle: task.operator.clone(),
                    downstream: task.downstream.clone(),
                })
            })
            .collect();

        let outcomes: OutcomeMap = latest_task_states_by_dag(self.store.as_ref())?
            .into_iter()
            .map(|(dag_id, tasks)| {
                let by_task = tasks
                    .into_iter()
                    .map(|(task_id, info)| {
                        let outcome = RunOutcome {
                            state: info.state,
                            duration: info.duration,
                        };
                        (task_id, outcome)
                    })
                    .collect();
                (dag_id, by_task)
            })
            .collect();

        debug!(dags = dags.len(), units = units.len(), "building DAG graph");
        Ok(build_node_graph(&units, &outcomes)?)
    }
}
