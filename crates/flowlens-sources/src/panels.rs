//! HTML panel of a DAG's latest task states.

use std::sync::Arc;

use askama::Template;
use flowlens_query::{NodeBucket, PanelContent, PanelReader, TimeRange};
use flowlens_state::ProcessingState;
use flowlens_state::WorkflowStore;
use flowlens_state::stats::latest_task_states;

pub const SOURCE: &str = "dag";

struct TaskRow {
    task_id: String,
    operator: String,
    state: &'static str,
    duration: String,
    color: &'static str,
}

#[derive(Template)]
#[template(path = "dag_panel.html")]
struct DagPanelTemplate {
    dag_id: String,
    known: bool,
    owners: String,
    execution_date: String,
    rows: Vec<TaskRow>,
}

pub struct DagPanel {
    store: Arc<dyn WorkflowStore>,
}

impl DagPanel {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }
}

impl PanelReader for DagPanel {
    fn render(&self, argument: &str, _range: &TimeRange) -> anyhow::Result<PanelContent> {
        let Some(dag) = self.store.dag(argument)? else {
            let tmpl = DagPanelTemplate {
                dag_id: argument.to_string(),
                known: false,
                owners: String::new(),
                execution_date: String::new(),
                rows: Vec::new(),
            };
            return Ok(PanelContent::html(tmpl.render()?));
        };

        let latest = latest_task_states(self.store.as_ref(), &dag.dag_id)?;
        let execution_date = latest
            .values()
            .map(|info| info.execution_date.to_rfc3339())
            .next()
            .unwrap_or_default();

        let rows = dag
            .tasks
            .iter()
            .map(|task| {
                let (state, duration) = match latest.get(&task.task_id) {
                    Some(info) => (info.state, format!("{} sec", info.duration)),
                    None => (ProcessingState::NoStatus, String::new()),
                };
                TaskRow {
                    task_id: task.task_id.clone(),
                    operator: task.operator.clone(),
                    state: state.as_str(),
                    duration,
                    color: NodeBucket::from_state(state).color(),
                }
            })
            .collect();

        let tmpl = DagPanelTemplate {
            dag_id: dag.dag_id,
            known: true,
            owners: dag.owners,
            execution_date,
            rows,
        };
        Ok(PanelContent::html(tmpl.render()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture_store;

    fn render(dag_id: &str) -> PanelContent {
        DagPanel::new(fixture_store())
            .render(dag_id, &TimeRange::unbounded())
            .unwrap()
    }

    #[test]
    fn renders_latest_task_states() {
        let panel = render("etl");
        assert!(panel.content_type.starts_with("text/html"));
        assert!(panel.body.contains("<h3>etl</h3>"));
        assert!(panel.body.contains("owner: ops"));
        assert!(panel.body.contains("<td style=\"color: green\">success</td>"));
        assert!(panel.body.contains("<td style=\"color: red\">failed</td>"));
        assert!(panel.body.contains("60 sec"));
        assert!(panel.body.contains("2024-01-02T00:00:00+00:00"));
    }

    #[test]
    fn unknown_dag_renders_a_notice() {
        let panel = render("nope");
        assert!(panel.body.contains("No DAG named nope."));
        assert!(!panel.body.contains("<table>"));
    }

    #[test]
    fn dag_ids_are_escaped() {
        let panel = render("<script>");
        assert!(!panel.body.contains("<script>"));
        assert!(panel.body.contains("<h3>&#60;script&#62;</h3>"));
    }
}
