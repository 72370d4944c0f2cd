//! Tabular results, the common shape every metric reader returns.
//!
//! A [`TabularResult`] has uniquely named, ordered columns and positional
//! rows. One column may be designated the time column (epoch millis).
//! Readers return either one table or a list of named tables; the
//! [`QueryOutput`] tag tells the filter engine and shaper which.

use serde::Serialize;
use serde_json::Value;

use crate::error::{QueryError, QueryResult};

/// Column name conventionally used for the time column.
pub const TIME_COLUMN: &str = "time";

/// An ordered table of JSON cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    time_column: Option<usize>,
}

impl TabularResult {
    /// Empty table with the given columns. Column names must be unique.
    pub fn new<I, S>(columns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(QueryError::InvalidTable(format!("duplicate column {name:?}")));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
            time_column: None,
        })
    }

    /// Mark an existing column as the time column.
    pub fn with_time_column(mut self, name: &str) -> QueryResult<Self> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| QueryError::InvalidTable(format!("no column {name:?}")))?;
        self.time_column = Some(idx);
        Ok(self)
    }

    /// Append a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> QueryResult<()> {
        if row.len() != self.columns.len() {
            return Err(QueryError::InvalidTable(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn time_column(&self) -> Option<&str> {
        self.time_column.map(|i| self.columns[i].as_str())
    }

    pub(crate) fn time_column_index(&self) -> Option<usize> {
        self.time_column
    }

    /// Cell at `row` in column `column`, if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Keep only the rows whose `column` cell equals `value`. An absent
    /// column reads as `null` in every row.
    pub fn retain_eq(mut self, column: &str, value: &Value) -> Self {
        match self.column_index(column) {
            Some(idx) => self.rows.retain(|row| cells_equal(&row[idx], value)),
            None => {
                if !value.is_null() {
                    self.rows.clear();
                }
            }
        }
        self
    }
}

/// Numbers compare by value, so `90` matches a `90.0` cell.
fn cells_equal(cell: &Value, value: &Value) -> bool {
    match (cell, value) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => cell == value,
    }
}

/// Display hints attached to a named result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_visualisation_type: Option<String>,
}

impl FrameMeta {
    /// Ask the dashboard to render the frame as a node graph.
    pub fn node_graph() -> Self {
        Self {
            preferred_visualisation_type: Some("nodeGraph".to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_visualisation_type.is_none()
    }
}

/// A table with a name and display metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub name: String,
    pub meta: FrameMeta,
    pub table: TabularResult,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, meta: FrameMeta, table: TabularResult) -> Self {
        Self {
            name: name.into(),
            meta,
            table,
        }
    }
}

/// What a metric reader returns.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Single(TabularResult),
    Named(Vec<NamedTable>),
}

impl QueryOutput {
    /// Total row count across all tables.
    pub fn row_count(&self) -> usize {
        match self {
            QueryOutput::Single(t) => t.len(),
            QueryOutput::Named(tables) => tables.iter().map(|n| n.table.len()).sum(),
        }
    }
}

impl From<TabularResult> for QueryOutput {
    fn from(table: TabularResult) -> Self {
        QueryOutput::Single(table)
    }
}

impl From<Vec<NamedTable>> for QueryOutput {
    fn from(tables: Vec<NamedTable>) -> Self {
        QueryOutput::Named(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TabularResult {
        let mut t = TabularResult::new(["time", "dag_id", "value"]).unwrap();
        t.push_row(vec![json!(1000), json!("etl"), json!(1.5)]).unwrap();
        t.push_row(vec![json!(2000), json!("report"), json!(2.5)]).unwrap();
        t.with_time_column("time").unwrap()
    }

    #[test]
    fn duplicate_columns_rejected() {
        let err = TabularResult::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidTable(_)));
    }

    #[test]
    fn row_width_checked() {
        let mut t = TabularResult::new(["a", "b"]).unwrap();
        assert!(t.push_row(vec![json!(1)]).is_err());
        assert!(t.is_empty());
    }

    #[test]
    fn unknown_time_column_rejected() {
        let t = TabularResult::new(["a"]).unwrap();
        assert!(t.with_time_column("time").is_err());
    }

    #[test]
    fn cell_lookup() {
        let t = sample();
        assert_eq!(t.cell(1, "dag_id"), Some(&json!("report")));
        assert_eq!(t.cell(5, "dag_id"), None);
        assert_eq!(t.cell(0, "missing"), None);
        assert_eq!(t.time_column(), Some("time"));
    }

    #[test]
    fn retain_eq_filters_rows() {
        let t = sample().retain_eq("dag_id", &json!("etl"));
        assert_eq!(t.len(), 1);
        assert_eq!(t.cell(0, "value"), Some(&json!(1.5)));
        assert_eq!(t.time_column(), Some("time"));
    }

    #[test]
    fn retain_eq_compares_numbers_by_value() {
        let mut t = TabularResult::new(["task_id", "avg_duration"]).unwrap();
        t.push_row(vec![json!("extract"), json!(90.0)]).unwrap();
        t.push_row(vec![json!("load"), json!(120.5)]).unwrap();

        let kept = t.clone().retain_eq("avg_duration", &json!(90));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.cell(0, "task_id"), Some(&json!("extract")));

        assert_eq!(t.clone().retain_eq("avg_duration", &json!(120.5)).len(), 1);
        assert!(t.retain_eq("avg_duration", &json!("90")).is_empty());
    }

    #[test]
    fn retain_eq_on_missing_column_drops_everything() {
        assert!(sample().retain_eq("owner", &json!("ops")).is_empty());
        assert_eq!(sample().retain_eq("owner", &Value::Null).len(), 2);
    }

    #[test]
    fn node_graph_meta_serializes_camel_case() {
        let json = serde_json::to_value(FrameMeta::node_graph()).unwrap();
        assert_eq!(json, json!({"preferredVisualisationType": "nodeGraph"}));
    }
}
