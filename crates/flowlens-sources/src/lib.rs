//! flowlens-sources: the producers registered at start-up.
//!
//! | Surface | Name | Producer |
//! |---|---|---|
//! | finder | `dags` | [`dags::DagFinder`] |
//! | metric reader | `dags` | [`dags::DagGraphReader`] (node graph) |
//! | metric reader | `task_states` | [`tasks::TaskStateReader`] |
//! | metric reader | `dag_runs` | [`runs::DagRunReader`] (time series) |
//! | annotation reader | `dag_runs` | [`runs::DagRunAnnotations`] |
//! | panel reader | `dag` | [`panels::DagPanel`] (HTML) |
//!
//! Every producer holds the shared read-only store. A target argument
//! equal to the source name, empty, or `*` selects every DAG; anything
//! else restricts the result to that DAG.

pub mod dags;
pub mod panels;
pub mod runs;
pub mod tags;
pub mod tasks;

use std::sync::Arc;

use flowlens_query::RegistryBuilder;
use flowlens_query::target::is_wildcard;
use flowlens_state::WorkflowStore;
use tracing::info;

pub use dags::{DagFinder, DagGraphReader};
pub use panels::DagPanel;
pub use runs::{DagRunAnnotations, DagRunReader};
pub use tags::{DAG_ID_TAG, TagKey, TagValue, tag_keys, tag_values};
pub use tasks::TaskStateReader;

/// Register every built-in producer on `builder`.
pub fn register_builtin(builder: &mut RegistryBuilder, store: Arc<dyn WorkflowStore>) {
    builder
        .register_finder(dags::SOURCE, DagFinder::new(store.clone()))
        .register_metric_reader(dags::SOURCE, DagGraphReader::new(store.clone()))
        .register_metric_reader(tasks::SOURCE, TaskStateReader::new(store.clone()))
        .register_metric_reader(runs::SOURCE, DagRunReader::new(store.clone()))
        .register_annotation_reader(runs::SOURCE, DagRunAnnotations::new(store.clone()))
        .register_panel_reader(panels::SOURCE, DagPanel::new(store));
    info!("built-in sources registered");
}

/// The DAG an argument restricts to, if any.
pub(crate) fn dag_scope<'a>(argument: &'a str, source: &str) -> Option<&'a str> {
    if is_wildcard(argument) || argument == source {
        None
    } else {
        Some(argument)
    }
}

#[cfg(test)]
pub(crate) fn fixture_store() -> Arc<dyn WorkflowStore> {
    let snapshot: flowlens_state::Snapshot =
        serde_json::from_str(include_str!("../../../tests/fixtures/snapshot.json")).unwrap();
    Arc::new(flowlens_state::MemoryStore::from_snapshot(snapshot))
}
