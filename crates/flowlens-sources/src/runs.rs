//! DAG run history: durations as time series, runs as annotations.

use std::sync::Arc;

use flowlens_query::{
    AnnotationEvent, AnnotationReader, FrameMeta, MetricReader, NamedTable, QueryOutput,
    TIME_COLUMN, TabularResult, TimeRange,
};
use flowlens_state::stats::seconds_between;
use flowlens_state::{DagRunRecord, WorkflowStore, to_processing_state};
use serde_json::json;

use crate::dag_scope;

pub const SOURCE: &str = "dag_runs";

fn runs_in_range(
    store: &dyn WorkflowStore,
    argument: &str,
    range: &TimeRange,
) -> anyhow::Result<Vec<DagRunRecord>> {
    let scope = dag_scope(argument, SOURCE);
    let mut runs: Vec<DagRunRecord> = store
        .dag_runs()?
        .into_iter()
        .filter(|r| scope.is_none_or(|id| r.dag_id == id))
        .filter(|r| range.contains(r.execution_date))
        .collect();
    runs.sort_by_key(|r| r.execution_date);
    Ok(runs)
}

fn run_seconds(run: &DagRunRecord) -> Option<f64> {
    Some(seconds_between(run.start_date?, run.end_date?))
}

/// One `time`/`duration` series per DAG, finished runs only.
pub struct DagRunReader {
    store: Arc<dyn WorkflowStore>,
}

impl DagRunReader {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

impl MetricReader for DagRunReader {
    fn read(&self, argument: &str, range: &TimeRange) -> anyhow::Result<QueryOutput> {
        let scope = dag_scope(argument, SOURCE);
        let mut dag_ids: Vec<String> = self
            .store
            .dags()?
            .into_iter()
            .map(|d| d.dag_id)
            .filter(|id| scope.is_none_or(|s| id == s))
            .collect();
        dag_ids.sort();

        let runs = runs_in_range(self.store.as_ref(), argument, range)?;
        let mut tables = Vec::with_capacity(dag_ids.len());
        for dag_id in dag_ids {
            let mut table = TabularResult::new([TIME_COLUMN, "duration"])?;
            for run in runs.iter().filter(|r| r.dag_id == dag_id) {
                if let Some(seconds) = run_seconds(run) {
                    table.push_row(vec![
                        json!(run.execution_date.timestamp_millis()),
                        json!(seconds),
                    ])?;
                }
            }
            let table = table.with_time_column(TIME_COLUMN)?;
            tables.push(NamedTable::new(dag_id, FrameMeta::default(), table));
        }
        Ok(QueryOutput::Named(tables))
    }
}

/// One annotation per run, at its execution date.
pub struct DagRunAnnotations {
    store: Arc<dyn WorkflowStore>,
}

impl DagRunAnnotations {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

impl AnnotationReader for DagRunAnnotations {
    fn annotations(
        &self,
        argument: &str,
        range: &TimeRange,
    ) -> anyhow::Result<Vec<AnnotationEvent>> {
        let mut events = Vec::new();
        for run in runs_in_range(self.store.as_ref(), argument, range)? {
            let state = to_processing_state(run.state.as_deref())?;
            let text = match run_seconds(&run) {
                Some(seconds) => format!("took {seconds} sec"),
                None => "not finished".to_string(),
            };
            events.push(AnnotationEvent {
                time: run.execution_date.timestamp_millis(),
                title: format!("{} {state}", run.dag_id),
                tags: vec![run.dag_id.clone(), state.to_string()],
                text,
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture_store;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn one_series_per_dag() {
        let reader = DagRunReader::new(fixture_store());
        let output = reader.read(SOURCE, &TimeRange::unbounded()).unwrap();
        let QueryOutput::Named(tables) = output else {
            panic!("expected named tables");
        };
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["etl", "legacy", "report"]);

        let etl = &tables[0].table;
        assert_eq!(etl.time_column(), Some(TIME_COLUMN));
        assert_eq!(etl.len(), 2);
        assert_eq!(etl.cell(0, "duration"), Some(&json!(600.0)));
        assert_eq!(etl.cell(1, "duration"), Some(&json!(300.0)));

        // unfinished run skipped
        assert_eq!(tables[2].table.len(), 1);
    }

    #[test]
    fn range_and_scope_restrict_runs() {
        let reader = DagRunReader::new(fixture_store());
        let range = TimeRange::new(day(1), day(2) + chrono::Duration::hours(12));
        let QueryOutput::Named(tables) = reader.read("etl", &range).unwrap() else {
            panic!("expected named tables");
        };
        assert_eq!(tables.len(), 1);
        // lower bound is exclusive
        assert_eq!(tables[0].table.len(), 1);
        assert_eq!(
            tables[0].table.cell(0, TIME_COLUMN),
            Some(&json!(day(2).timestamp_millis()))
        );
    }

    #[test]
    fn annotations_per_run() {
        let reader = DagRunAnnotations::new(fixture_store());
        let events = reader.annotations("report", &TimeRange::unbounded()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "report success");
        assert_eq!(events[0].tags, vec!["report", "success"]);
        assert_eq!(events[0].text, "took 300 sec");
        assert_eq!(events[1].title, "report running");
        assert_eq!(events[1].text, "not finished");
    }
}
