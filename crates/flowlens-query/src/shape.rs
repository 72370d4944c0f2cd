//! Response shaping into the dashboard wire forms.
//!
//! ```text
//!   QueryOutput ──┬── shape_time_series ──► [{target, datapoints}]
//!                 └── shape_table ────────► [{type:"table", columns, rows}]
//!   [AnnotationEvent] ── shape_annotations ─► [{annotation, time, title, tags, text}]
//! ```

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryError, QueryResult};
use crate::range::TimeRange;
use crate::table::{FrameMeta, NamedTable, QueryOutput, TabularResult};

// ── Response kind ──────────────────────────────────────────────

/// Output form requested per target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    #[default]
    TimeSeries,
    Table,
}

impl ResponseKind {
    /// `"table"` selects the table form; anything else is a time series.
    pub fn from_type(kind: Option<&str>) -> Self {
        match kind {
            Some("table") => ResponseKind::Table,
            _ => ResponseKind::TimeSeries,
        }
    }
}

// ── Time series ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesMeta {
    pub interval_ms: u64,
}

/// One labelled series of `[value, epoch_millis]` points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesEntry {
    pub target: String,
    pub datapoints: Vec<(Value, i64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<SeriesMeta>,
}

/// Reads a time cell as epoch millis. Numbers are millis, strings RFC 3339.
fn time_millis(cell: &Value) -> Option<i64> {
    match cell {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        _ => None,
    }
}

fn series(
    table: &TabularResult,
    time_idx: usize,
    value_idx: usize,
    label: String,
    meta: Option<&SeriesMeta>,
) -> TimeSeriesEntry {
    let mut datapoints: Vec<(Value, i64)> = table
        .rows()
        .iter()
        .filter(|row| !row[value_idx].is_null())
        .filter_map(|row| Some((row[value_idx].clone(), time_millis(&row[time_idx])?)))
        .collect();
    datapoints.sort_by_key(|(_, ts)| *ts);
    TimeSeriesEntry {
        target: label,
        datapoints,
        meta: meta.cloned(),
    }
}

/// Shape a reader result as time series. `label` names the result in
/// errors when it lacks a time column.
pub fn shape_time_series(
    output: &QueryOutput,
    label: &str,
    interval_ms: Option<u64>,
) -> QueryResult<Vec<TimeSeriesEntry>> {
    let meta = interval_ms.map(|interval_ms| SeriesMeta { interval_ms });
    match output {
        QueryOutput::Single(table) => {
            let time_idx = table
                .time_column_index()
                .ok_or_else(|| QueryError::NotTimeSeries(label.to_string()))?;
            Ok(table
                .columns()
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != time_idx)
                .map(|(i, name)| series(table, time_idx, i, name.clone(), meta.as_ref()))
                .collect())
        }
        QueryOutput::Named(tables) => tables
            .iter()
            .map(|named| {
                let table = &named.table;
                let time_idx = table
                    .time_column_index()
                    .ok_or_else(|| QueryError::NotTimeSeries(named.name.clone()))?;
                let entry = match (0..table.columns().len()).find(|i| *i != time_idx) {
                    Some(value_idx) => {
                        series(table, time_idx, value_idx, named.name.clone(), meta.as_ref())
                    }
                    None => TimeSeriesEntry {
                        target: named.name.clone(),
                        datapoints: Vec::new(),
                        meta: meta.clone(),
                    },
                };
                Ok(entry)
            })
            .collect(),
    }
}

// ── Table ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Time,
    Number,
    String,
    Boolean,
    Other,
}

impl ColumnType {
    fn infer(table: &TabularResult, idx: usize) -> Self {
        if table.time_column_index() == Some(idx) {
            return ColumnType::Time;
        }
        match table.rows().iter().map(|r| &r[idx]).find(|v| !v.is_null()) {
            Some(Value::Number(_)) => ColumnType::Number,
            Some(Value::String(_)) => ColumnType::String,
            Some(Value::Bool(_)) => ColumnType::Boolean,
            _ => ColumnType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Value>>,
}

fn table_entry(table: TabularResult, name: Option<String>, meta: Option<FrameMeta>) -> TableEntry {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, text)| ColumnSpec {
            text: text.clone(),
            kind: ColumnType::infer(&table, i),
        })
        .collect();
    TableEntry {
        kind: "table",
        name,
        meta,
        columns,
        rows: table.rows().to_vec(),
    }
}

/// One table object per result, columns in their original order.
pub fn shape_table(output: QueryOutput) -> Vec<TableEntry> {
    match output {
        QueryOutput::Single(table) => vec![table_entry(table, None, None)],
        QueryOutput::Named(tables) => tables
            .into_iter()
            .map(|NamedTable { name, meta, table }| table_entry(table, Some(name), Some(meta)))
            .collect(),
    }
}

// ── Annotations ────────────────────────────────────────────────

/// An event produced by an annotation reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEvent {
    /// Epoch milliseconds.
    pub time: i64,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEntry {
    /// The request's annotation object, echoed back.
    pub annotation: Value,
    pub time: i64,
    pub title: String,
    pub tags: Vec<String>,
    pub text: String,
}

/// Attach the request annotation and drop events outside `range`.
pub fn shape_annotations(
    events: Vec<AnnotationEvent>,
    annotation: &Value,
    range: &TimeRange,
) -> Vec<AnnotationEntry> {
    events
        .into_iter()
        .filter(|e| range.contains_millis(e.time))
        .map(|e| AnnotationEntry {
            annotation: annotation.clone(),
            time: e.time,
            title: e.title,
            tags: e.tags,
            text: e.text,
        })
        .collect()
}

// ── Flattened query response ───────────────────────────────────

/// One element of the flattened `query` response array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShapedEntry {
    TimeSeries(TimeSeriesEntry),
    Table(TableEntry),
}

/// Shape `output` in the requested form.
pub fn shape(
    output: QueryOutput,
    kind: ResponseKind,
    label: &str,
    interval_ms: Option<u64>,
) -> QueryResult<Vec<ShapedEntry>> {
    Ok(match kind {
        ResponseKind::Table => shape_table(output).into_iter().map(ShapedEntry::Table).collect(),
        ResponseKind::TimeSeries => shape_time_series(&output, label, interval_ms)?
            .into_iter()
            .map(ShapedEntry::TimeSeries)
            .collect(),
    })
}
