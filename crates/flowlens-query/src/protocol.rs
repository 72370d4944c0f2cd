//! Request bodies of the simple-JSON datasource protocol.

use serde::Deserialize;
use serde_json::Value;

use crate::filter::AdHocFilter;
use crate::range::{RawRange, RawTime};

/// `search` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub target: Option<String>,
}

/// One entry of `query.targets`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetSpec {
    pub target: String,
    /// `"table"` or `"timeserie"`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl TargetSpec {
    pub fn table(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: Some("table".to_string()),
        }
    }
}

/// `query` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub targets: Option<Vec<TargetSpec>>,
    #[serde(default)]
    pub range: Option<RawRange>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub adhoc_filters: Vec<AdHocFilter>,
}

/// `annotations` body. The annotation object is kept whole so it can be
/// echoed back on every event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnnotationRequest {
    #[serde(default)]
    pub range: Option<RawRange>,
    #[serde(default)]
    pub annotation: Value,
}

impl AnnotationRequest {
    /// `annotation.query`, empty when absent.
    pub fn query(&self) -> &str {
        self.annotation
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// `panels` query string. Bounds are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PanelParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl PanelParams {
    pub fn raw_range(&self) -> RawRange {
        RawRange {
            from: self.from.clone().map(RawTime::Text),
            to: self.to.clone().map(RawTime::Text),
        }
    }
}

/// `tag-values` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TagValuesRequest {
    #[serde(default)]
    pub key: String,
}
