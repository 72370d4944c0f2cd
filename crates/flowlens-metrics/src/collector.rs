//! Metrics collector: turns workflow statistics into metric families.
//!
//! Every scrape reads the store afresh. Families with no samples are still
//! returned so the exposition always declares them.

use std::collections::BTreeMap;
use std::sync::Arc;

use flowlens_core::XcomParam;
use flowlens_state::stats::{
    dag_bag_info, dag_duration_info, dag_scheduler_delay, dag_state_info, latest_task_states_all,
    num_queued_tasks, task_duration_info, task_failure_counts, task_scheduler_delay,
    task_state_info, xcom_params,
};
use flowlens_state::{ProcessingState, StateResult, WorkflowStore};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// One labelled value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

/// A named metric with its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            samples: Vec::new(),
        }
    }

    pub fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            kind: MetricKind::Counter,
            ..Self::gauge(name, help)
        }
    }

    pub fn add(&mut self, labels: Vec<(&'static str, String)>, value: f64) {
        self.samples.push(Sample { labels, value });
    }
}

/// Computes every workflow metric family from a store.
pub struct MetricsCollector {
    store: Arc<dyn WorkflowStore>,
    xcom_params: Vec<XcomParam>,
}

impl MetricsCollector {
    pub fn new(store: Arc<dyn WorkflowStore>, xcom_params: Vec<XcomParam>) -> Self {
        Self { store, xcom_params }
    }

    /// All families, in exposition order.
    pub fn collect(&self) -> StateResult<Vec<MetricFamily>> {
        let mut families = Vec::new();
        families.extend(self.task_families()?);
        families.extend(self.dag_families()?);
        families.extend(self.scheduler_families()?);
        families.extend(self.dag_bag_families()?);
        debug!(
            families = families.len(),
            samples = families.iter().map(|f| f.samples.len()).sum::<usize>(),
            "metrics collected"
        );
        Ok(families)
    }

    // ── DAGs ───────────────────────────────────────────────────

    pub fn dag_families(&self) -> StateResult<Vec<MetricFamily>> {
        let store = self.store.as_ref();

        let mut status = MetricFamily::gauge(
            "airflow_dag_status",
            "Shows the number of dag starts with this status",
        );
        for dag in dag_state_info(store)? {
            status.add(
                vec![
                    ("dag_id", dag.dag_id),
                    ("owner", dag.owner),
                    ("status", dag.state.to_string()),
                ],
                dag.count as f64,
            );
        }

        let mut duration = MetricFamily::gauge(
            "airflow_dag_run_duration",
            "Duration of successful dag_runs in seconds",
        );
        for dag in dag_duration_info(store)? {
            let seconds = dag.seconds();
            duration.add(vec![("dag_id", dag.dag_id)], seconds);
        }

        Ok(vec![status, duration])
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub fn task_families(&self) -> StateResult<Vec<MetricFamily>> {
        let store = self.store.as_ref();
        let task_info = task_state_info(store)?;

        let mut status = MetricFamily::gauge(
            "airflow_task_status",
            "Shows the number of task instances with particular status",
        );
        for task in &task_info {
            status.add(
                vec![
                    ("dag_id", task.dag_id.clone()),
                    ("task_id", task.task_id.clone()),
                    ("operator_name", task.operator_name.clone()),
                    ("owner", task.owner.clone()),
                    ("state", task.state.to_string()),
                ],
                task.count as f64,
            );
        }

        // One series per task: durations of successful instances, retries
        // over every state.
        let mut durations = MetricFamily::gauge(
            "airflow_task_duration",
            "Durations of tasks in seconds by operator",
        );
        let mut max_tries: BTreeMap<(&str, &str, &str), u32> = BTreeMap::new();
        for task in &task_info {
            let key = (
                task.dag_id.as_str(),
                task.task_id.as_str(),
                task.operator_name.as_str(),
            );
            let tries = max_tries.entry(key).or_default();
            *tries = (*tries).max(task.max_tries);

            if task.state != ProcessingState::Success {
                continue;
            }
            for (aggregation, value) in [
                ("avg", task.avg_duration),
                ("min", task.min_duration),
                ("max", task.max_duration),
            ] {
                durations.add(
                    vec![
                        ("aggregation", aggregation.to_string()),
                        ("operator_name", task.operator_name.clone()),
                        ("task_id", task.task_id.clone()),
                        ("dag_id", task.dag_id.clone()),
                    ],
                    value,
                );
            }
        }

        let mut tries = MetricFamily::gauge("airflow_task_max_tries", "Max tries for tasks");
        for ((dag_id, task_id, operator_name), value) in max_tries {
            tries.add(
                vec![
                    ("operator_name", operator_name.to_string()),
                    ("task_id", task_id.to_string()),
                    ("dag_id", dag_id.to_string()),
                ],
                f64::from(value),
            );
        }

        let mut last_run =
            MetricFamily::gauge("airflow_last_dag_run", "Tasks status for latest dag run");
        for task in latest_task_states_all(store)? {
            last_run.add(
                vec![
                    ("status", task.state.to_string()),
                    ("task_id", task.task_id),
                    ("dag_id", task.dag_id),
                ],
                task.duration,
            );
        }

        let mut successful = MetricFamily::gauge(
            "airflow_successful_task_duration",
            "Duration of successful tasks in seconds",
        );
        for task in task_duration_info(store)? {
            let seconds = task.seconds();
            successful.add(
                vec![
                    ("task_id", task.task_id),
                    ("dag_id", task.dag_id),
                    ("execution_date", task.execution_date.date_naive().to_string()),
                ],
                seconds,
            );
        }

        let mut failures = MetricFamily::gauge("airflow_task_fail_count", "Count of failed tasks");
        for task in task_failure_counts(store)? {
            failures.add(
                vec![("dag_id", task.dag_id), ("task_id", task.task_id)],
                task.count as f64,
            );
        }

        let mut xcom = MetricFamily::gauge("airflow_xcom_parameter", "Airflow Xcom Parameter");
        for param in &self.xcom_params {
            for record in xcom_params(store, &param.task_id)? {
                let Some(value) = record.value.get(&param.key).and_then(serde_json::Value::as_f64)
                else {
                    continue;
                };
                xcom.add(
                    vec![("dag_id", record.dag_id), ("task_id", record.task_id)],
                    value,
                );
            }
        }

        let mut task_delay = MetricFamily::gauge(
            "airflow_task_scheduler_delay",
            "Airflow Task scheduling delay",
        );
        for delay in task_scheduler_delay(store)? {
            let seconds = delay.seconds();
            task_delay.add(vec![("queue", delay.queue)], seconds);
        }

        let mut queued = MetricFamily::gauge(
            "airflow_num_queued_tasks",
            "Airflow Number of Queued Tasks",
        );
        queued.add(Vec::new(), num_queued_tasks(store)? as f64);

        Ok(vec![
            status,
            durations,
            tries,
            last_run,
            successful,
            failures,
            xcom,
            task_delay,
            queued,
        ])
    }

    // ── Scheduler ──────────────────────────────────────────────

    pub fn scheduler_families(&self) -> StateResult<Vec<MetricFamily>> {
        let mut delay = MetricFamily::gauge(
            "airflow_dag_scheduler_delay",
            "Airflow DAG scheduling delay",
        );
        for dag in dag_scheduler_delay(self.store.as_ref())? {
            let seconds = dag.seconds();
            delay.add(vec![("dag_id", dag.dag_id)], seconds);
        }
        Ok(vec![delay])
    }

    // ── DAG bag ────────────────────────────────────────────────

    pub fn dag_bag_families(&self) -> StateResult<Vec<MetricFamily>> {
        let info = dag_bag_info(self.store.as_ref())?;
        let mut stats = MetricFamily::counter("dag_bag_stats", "Dag bag stats");
        stats.add(
            vec![("property", "loaded_dags_count".to_string())],
            info.loaded_dags_count as f64,
        );
        Ok(vec![stats])
    }
}
