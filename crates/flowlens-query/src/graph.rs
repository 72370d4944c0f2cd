//! Node-graph construction.
//!
//! Work units become nodes (deduplicated by `collection.id`) and their
//! downstream links become edges. Each node is colored by the bucket of its
//! most recent run outcome; the dashboard reads the bucket from the
//! `arc__*` columns, exactly one of which is 1.

use std::collections::{BTreeSet, HashMap};

use flowlens_state::ProcessingState;
use serde_json::{Value, json};

use crate::error::QueryResult;
use crate::table::{FrameMeta, NamedTable, QueryOutput, TabularResult};

/// A node candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    /// Identifier, unique within `collection`.
    pub id: String,
    pub collection: String,
    pub title: String,
    pub subtitle: String,
    /// Identifiers of downstream units in the same collection.
    pub downstream: Vec<String>,
}

/// Most recent run of a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOutcome {
    pub state: ProcessingState,
    pub duration: f64,
}

/// Unit id → outcome, per collection.
pub type OutcomeMap = HashMap<String, HashMap<String, RunOutcome>>;

/// Mutually exclusive color buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeBucket {
    Success,
    Failure,
    Running,
    Pending,
    Unknown,
}

impl NodeBucket {
    pub const ALL: [NodeBucket; 5] = [
        NodeBucket::Success,
        NodeBucket::Failure,
        NodeBucket::Running,
        NodeBucket::Pending,
        NodeBucket::Unknown,
    ];

    pub fn from_state(state: ProcessingState) -> Self {
        match state {
            ProcessingState::Success => NodeBucket::Success,
            ProcessingState::Failed => NodeBucket::Failure,
            ProcessingState::Running => NodeBucket::Running,
            ProcessingState::Queued | ProcessingState::Scheduled => NodeBucket::Pending,
            _ => NodeBucket::Unknown,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            NodeBucket::Success => "green",
            NodeBucket::Failure => "red",
            NodeBucket::Running => "purple",
            NodeBucket::Pending | NodeBucket::Unknown => "gray",
        }
    }

    /// Node-graph arc column for this bucket.
    pub fn column(&self) -> &'static str {
        match self {
            NodeBucket::Success => "arc__success",
            NodeBucket::Failure => "arc__failure",
            NodeBucket::Running => "arc__running",
            NodeBucket::Pending => "arc__pending",
            NodeBucket::Unknown => "arc__unknown",
        }
    }
}

pub const NODES: &str = "nodes";
pub const EDGES: &str = "edges";

const NODE_COLUMNS: [&str; 7] = [
    "id",
    "title",
    "subTitle",
    "mainStat",
    "secondaryStat",
    "task_id",
    "dag_id",
];

const EDGE_COLUMNS: [&str; 5] = ["id", "source", "target", "dag_id", "task_id"];

fn node_key(collection: &str, id: &str) -> String {
    format!("{collection}.{id}")
}

/// Build the `nodes` and `edges` results for `units`.
pub fn build_node_graph(units: &[WorkUnit], outcomes: &OutcomeMap) -> QueryResult<QueryOutput> {
    let mut ids: HashMap<String, u64> = HashMap::new();
    let mut order: Vec<&WorkUnit> = Vec::new();
    for unit in units {
        let key = node_key(&unit.collection, &unit.id);
        if !ids.contains_key(&key) {
            ids.insert(key, ids.len() as u64);
            order.push(unit);
        }
    }

    let node_columns = NODE_COLUMNS
        .iter()
        .copied()
        .chain(NodeBucket::ALL.iter().map(NodeBucket::column));
    let mut nodes = TabularResult::new(node_columns)?;
    for unit in &order {
        let id = ids[&node_key(&unit.collection, &unit.id)];
        let outcome = outcomes
            .get(&unit.collection)
            .and_then(|by_unit| by_unit.get(&unit.id));
        let (state, duration) = match outcome {
            Some(o) => (o.state, format!("{} sec", o.duration)),
            None => (ProcessingState::NoStatus, String::new()),
        };
        let bucket = NodeBucket::from_state(state);

        let mut row: Vec<Value> = vec![
            json!(id),
            json!(unit.title),
            json!(unit.subtitle),
            json!(state.as_str()),
            json!(duration),
            json!(unit.id),
            json!(unit.collection),
        ];
        row.extend(
            NodeBucket::ALL
                .iter()
                .map(|b| json!(if *b == bucket { 1 } else { 0 })),
        );
        nodes.push_row(row)?;
    }

    let mut edges = TabularResult::new(EDGE_COLUMNS)?;
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for unit in &order {
        let source = ids[&node_key(&unit.collection, &unit.id)];
        for downstream in &unit.downstream {
            let Some(&target) = ids.get(&node_key(&unit.collection, downstream)) else {
                continue;
            };
            if source == target {
                continue;
            }
            let edge_id = format!("{source}--{target}");
            if !seen.insert(edge_id.clone()) {
                continue;
            }
            edges.push_row(vec![
                json!(edge_id),
                json!(source),
                json!(target),
                json!(unit.collection),
                json!(unit.id),
            ])?;
        }
    }

    Ok(QueryOutput::Named(vec![
        NamedTable::new(NODES, FrameMeta::node_graph(), nodes),
        NamedTable::new(EDGES, FrameMeta::node_graph(), edges),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, downstream: &[&str]) -> WorkUnit {
        WorkUnit {
            id: id.to_string(),
            collection: "etl".to_string(),
            title: id.to_string(),
            subtitle: "BashOperator".to_string(),
            downstream: downstream.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn split(output: QueryOutput) -> (TabularResult, TabularResult) {
        match output {
            QueryOutput::Named(mut tables) => {
                assert_eq!(tables.len(), 2);
                assert!(tables.iter().all(|t| t.meta == FrameMeta::node_graph()));
                let edges = tables.pop().unwrap();
                let nodes = tables.pop().unwrap();
                assert_eq!(nodes.name, NODES);
                assert_eq!(edges.name, EDGES);
                (nodes.table, edges.table)
            }
            QueryOutput::Single(_) => panic!("expected named output"),
        }
    }

    #[test]
    fn exactly_one_bucket_per_state() {
        for state in ProcessingState::ALL {
            let mut outcomes = OutcomeMap::new();
            outcomes.entry("etl".to_string()).or_default().insert(
                "a".to_string(),
                RunOutcome {
                    state,
                    duration: 1.0,
                },
            );
            let (nodes, _) = split(build_node_graph(&[unit("a", &[])], &outcomes).unwrap());
            let flags: Vec<i64> = NodeBucket::ALL
                .iter()
                .map(|b| nodes.cell(0, b.column()).and_then(Value::as_i64).unwrap())
                .collect();
            assert_eq!(flags.iter().sum::<i64>(), 1, "state {state}");
            let expected = NodeBucket::from_state(state);
            assert_eq!(nodes.cell(0, expected.column()), Some(&json!(1)));
        }
    }

    #[test]
    fn bucket_precedence_and_colors() {
        assert_eq!(NodeBucket::from_state(ProcessingState::Success).color(), "green");
        assert_eq!(NodeBucket::from_state(ProcessingState::Failed).color(), "red");
        assert_eq!(NodeBucket::from_state(ProcessingState::Running).color(), "purple");
        assert_eq!(
            NodeBucket::from_state(ProcessingState::Scheduled),
            NodeBucket::Pending
        );
        assert_eq!(
            NodeBucket::from_state(ProcessingState::UpstreamFailed),
            NodeBucket::Unknown
        );
        assert_eq!(
            NodeBucket::from_state(ProcessingState::NoStatus),
            NodeBucket::Unknown
        );
    }

    #[test]
    fn missing_outcome_is_no_status() {
        let (nodes, _) = split(build_node_graph(&[unit("a", &[])], &OutcomeMap::new()).unwrap());
        assert_eq!(nodes.cell(0, "mainStat"), Some(&json!("no_status")));
        assert_eq!(nodes.cell(0, "secondaryStat"), Some(&json!("")));
        assert_eq!(nodes.cell(0, "arc__unknown"), Some(&json!(1)));
    }

    #[test]
    fn duration_is_reported_in_seconds() {
        let mut outcomes = OutcomeMap::new();
        outcomes.entry("etl".to_string()).or_default().insert(
            "a".to_string(),
            RunOutcome {
                state: ProcessingState::Success,
                duration: 12.5,
            },
        );
        let (nodes, _) = split(build_node_graph(&[unit("a", &[])], &outcomes).unwrap());
        assert_eq!(nodes.cell(0, "mainStat"), Some(&json!("success")));
        assert_eq!(nodes.cell(0, "secondaryStat"), Some(&json!("12.5 sec")));
    }

    #[test]
    fn node_ids_are_dense_and_deduplicated() {
        let units = [unit("a", &["b"]), unit("b", &[]), unit("a", &["b"])];
        let (nodes, _) = split(build_node_graph(&units, &OutcomeMap::new()).unwrap());
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.cell(0, "id"), Some(&json!(0)));
        assert_eq!(nodes.cell(1, "id"), Some(&json!(1)));
    }

    #[test]
    fn self_loops_dropped_and_duplicate_edges_collapse() {
        let units = [unit("a", &["a", "b", "b"]), unit("b", &["c"]), unit("c", &[])];
        let (_, edges) = split(build_node_graph(&units, &OutcomeMap::new()).unwrap());
        let ids: Vec<_> = edges.rows().iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec![json!("0--1"), json!("1--2")]);
    }

    #[test]
    fn same_id_in_two_collections_is_two_nodes() {
        let mut other = unit("a", &[]);
        other.collection = "report".to_string();
        let (nodes, _) =
            split(build_node_graph(&[unit("a", &[]), other], &OutcomeMap::new()).unwrap());
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn unknown_downstream_is_ignored() {
        let (_, edges) =
            split(build_node_graph(&[unit("a", &["ghost"])], &OutcomeMap::new()).unwrap());
        assert!(edges.is_empty());
    }
}
