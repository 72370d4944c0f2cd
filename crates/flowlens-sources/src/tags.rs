//! Ad-hoc filter discovery: the keys a dashboard may filter on and the
//! values each key takes.

use flowlens_state::{StateResult, WorkflowStore};
use serde::Serialize;

/// The one filterable key.
pub const DAG_ID_TAG: &str = "dag_id";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagKey {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagValue {
    pub text: String,
}

pub fn tag_keys() -> Vec<TagKey> {
    vec![TagKey {
        kind: "string",
        text: DAG_ID_TAG,
    }]
}

/// Sorted DAG ids for `dag_id`; nothing for any other key.
pub fn tag_values(store: &dyn WorkflowStore, key: &str) -> StateResult<Vec<TagValue>> {
    if key != DAG_ID_TAG {
        return Ok(Vec::new());
    }
    let mut ids: Vec<String> = store.dags()?.into_iter().map(|d| d.dag_id).collect();
    ids.sort();
    Ok(ids.into_iter().map(|text| TagValue { text }).collect())
}
