//! Aggregate statistics over workflow records.
//!
//! Each function reads what it needs from a [`WorkflowStore`] and folds it
//! into a small summary type. Every raw state passes through the state
//! normalizer, so one unrecognized token fails the whole statistic.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StateResult;
use crate::state::{ProcessingState, to_processing_state};
use crate::store::WorkflowStore;
use crate::types::*;

/// Seconds between two instants, with millisecond precision.
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

fn state_of(raw: &Option<String>) -> StateResult<ProcessingState> {
    to_processing_state(raw.as_deref())
}

/// Owners of every active, unpaused DAG.
fn live_owners(store: &dyn WorkflowStore) -> StateResult<HashMap<DagId, String>> {
    Ok(store
        .dags()?
        .into_iter()
        .filter(DagInfo::is_live)
        .map(|d| (d.dag_id, d.owners))
        .collect())
}

// ── Task state counts ─────────────────────────────────────────────

/// Task instances grouped by DAG, task, operator and state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStateInfo {
    pub dag_id: DagId,
    pub task_id: TaskId,
    pub operator_name: String,
    pub owner: String,
    pub state: ProcessingState,
    pub count: u64,
    pub avg_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    pub max_tries: u32,
}

#[derive(Default)]
struct DurationAcc {
    count: u64,
    sum: f64,
    samples: u64,
    min: Option<f64>,
    max: Option<f64>,
    max_tries: u32,
}

/// Number of task instances in each state, with duration aggregates.
pub fn task_state_info(store: &dyn WorkflowStore) -> StateResult<Vec<TaskStateInfo>> {
    let owners = live_owners(store)?;
    let mut groups: BTreeMap<(DagId, TaskId, String, ProcessingState), DurationAcc> =
        BTreeMap::new();

    for ti in store.task_instances()? {
        if !owners.contains_key(&ti.dag_id) {
            continue;
        }
        let state = state_of(&ti.state)?;
        let acc = groups
            .entry((ti.dag_id, ti.task_id, ti.operator, state))
            .or_default();
        acc.count += 1;
        acc.max_tries = acc.max_tries.max(ti.max_tries);
        if let Some(d) = ti.duration {
            acc.sum += d;
            acc.samples += 1;
            acc.min = Some(acc.min.map_or(d, |m| m.min(d)));
            acc.max = Some(acc.max.map_or(d, |m| m.max(d)));
        }
    }

    Ok(groups
        .into_iter()
        .map(|((dag_id, task_id, operator_name, state), acc)| TaskStateInfo {
            owner: owners.get(&dag_id).cloned().unwrap_or_default(),
            avg_duration: if acc.samples > 0 {
                acc.sum / acc.samples as f64
            } else {
                0.0
            },
            min_duration: acc.min.unwrap_or(0.0),
            max_duration: acc.max.unwrap_or(0.0),
            max_tries: acc.max_tries,
            count: acc.count,
            dag_id,
            task_id,
            operator_name,
            state,
        })
        .collect())
}

// ── Latest run ────────────────────────────────────────────────────

/// Outcome of a task in its DAG's most recent run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestTaskInfo {
    pub dag_id: DagId,
    pub task_id: TaskId,
    pub execution_date: DateTime<Utc>,
    pub state: ProcessingState,
    /// Seconds; 0 when the store has no duration.
    pub duration: f64,
}

fn latest_execution(runs: &[DagRunRecord], dag_id: &str) -> Option<DateTime<Utc>> {
    runs.iter()
        .filter(|r| r.dag_id == dag_id)
        .map(|r| r.execution_date)
        .max()
}

fn latest_for(
    dag_id: &str,
    runs: &[DagRunRecord],
    instances: &[TaskInstanceRecord],
) -> StateResult<BTreeMap<TaskId, LatestTaskInfo>> {
    let Some(latest) = latest_execution(runs, dag_id) else {
        return Ok(BTreeMap::new());
    };

    let mut out = BTreeMap::new();
    for ti in instances
        .iter()
        .filter(|ti| ti.dag_id == dag_id && ti.execution_date == latest)
    {
        out.insert(
            ti.task_id.clone(),
            LatestTaskInfo {
                dag_id: ti.dag_id.clone(),
                task_id: ti.task_id.clone(),
                execution_date: ti.execution_date,
                state: state_of(&ti.state)?,
                duration: ti.duration.unwrap_or(0.0),
            },
        );
    }
    Ok(out)
}

/// Task outcomes of the most recent run of one DAG, keyed by task id.
pub fn latest_task_states(
    store: &dyn WorkflowStore,
    dag_id: &str,
) -> StateResult<BTreeMap<TaskId, LatestTaskInfo>> {
    latest_for(dag_id, &store.dag_runs()?, &store.task_instances()?)
}

/// Latest task outcomes for every DAG, keyed by DAG id.
pub fn latest_task_states_by_dag(
    store: &dyn WorkflowStore,
) -> StateResult<BTreeMap<DagId, BTreeMap<TaskId, LatestTaskInfo>>> {
    let runs = store.dag_runs()?;
    let instances = store.task_instances()?;
    let mut out = BTreeMap::new();
    for dag in store.dags()? {
        let latest = latest_for(&dag.dag_id, &runs, &instances)?;
        out.insert(dag.dag_id, latest);
    }
    Ok(out)
}

/// Flattened [`latest_task_states_by_dag`].
pub fn latest_task_states_all(store: &dyn WorkflowStore) -> StateResult<Vec<LatestTaskInfo>> {
    Ok(latest_task_states_by_dag(store)?
        .into_values()
        .flat_map(BTreeMap::into_values)
        .collect())
}

// ── DAG runs ──────────────────────────────────────────────────────

/// Number of runs of a DAG in a given state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagStateInfo {
    pub dag_id: DagId,
    pub owner: String,
    pub state: ProcessingState,
    pub count: u64,
}

pub fn dag_state_info(store: &dyn WorkflowStore) -> StateResult<Vec<DagStateInfo>> {
    let owners = live_owners(store)?;
    let mut counts: BTreeMap<(DagId, ProcessingState), u64> = BTreeMap::new();
    for run in store.dag_runs()? {
        if !owners.contains_key(&run.dag_id) {
            continue;
        }
        let state = state_of(&run.state)?;
        *counts.entry((run.dag_id, state)).or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .map(|((dag_id, state), count)| DagStateInfo {
            owner: owners.get(&dag_id).cloned().unwrap_or_default(),
            dag_id,
            state,
            count,
        })
        .collect())
}

/// Latest successful, finished run of each live DAG.
fn latest_successful_runs(
    store: &dyn WorkflowStore,
    runs: &[DagRunRecord],
) -> StateResult<Vec<DagRunRecord>> {
    let owners = live_owners(store)?;
    let mut latest: BTreeMap<DagId, DagRunRecord> = BTreeMap::new();
    for run in runs {
        if !owners.contains_key(&run.dag_id) || run.end_date.is_none() {
            continue;
        }
        if state_of(&run.state)? != ProcessingState::Success {
            continue;
        }
        match latest.get(&run.dag_id) {
            Some(prev) if prev.execution_date >= run.execution_date => {}
            _ => {
                latest.insert(run.dag_id.clone(), run.clone());
            }
        }
    }
    Ok(latest.into_values().collect())
}

/// Wall-clock span of a DAG's latest successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagDurationInfo {
    pub dag_id: DagId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl DagDurationInfo {
    pub fn seconds(&self) -> f64 {
        seconds_between(self.start_date, self.end_date)
    }
}

/// The run starts when its first task starts.
pub fn dag_duration_info(store: &dyn WorkflowStore) -> StateResult<Vec<DagDurationInfo>> {
    let runs = store.dag_runs()?;
    let instances = store.task_instances()?;
    let mut out = Vec::new();
    for run in latest_successful_runs(store, &runs)? {
        let first_task_start = instances
            .iter()
            .filter(|ti| ti.dag_id == run.dag_id && ti.execution_date == run.execution_date)
            .filter_map(|ti| ti.start_date)
            .min();
        let (Some(start_date), Some(end_date)) = (first_task_start.or(run.start_date), run.end_date)
        else {
            continue;
        };
        out.push(DagDurationInfo {
            dag_id: run.dag_id,
            start_date,
            end_date,
        });
    }
    Ok(out)
}

/// A successful task of a DAG's latest successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDurationInfo {
    pub dag_id: DagId,
    pub task_id: TaskId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub execution_date: DateTime<Utc>,
}

impl TaskDurationInfo {
    pub fn seconds(&self) -> f64 {
        seconds_between(self.start_date, self.end_date)
    }
}

pub fn task_duration_info(store: &dyn WorkflowStore) -> StateResult<Vec<TaskDurationInfo>> {
    let runs = store.dag_runs()?;
    let instances = store.task_instances()?;
    let mut out = Vec::new();
    for run in latest_successful_runs(store, &runs)? {
        for ti in instances
            .iter()
            .filter(|ti| ti.dag_id == run.dag_id && ti.execution_date == run.execution_date)
        {
            if state_of(&ti.state)? != ProcessingState::Success {
                continue;
            }
            if let (Some(start_date), Some(end_date)) = (ti.start_date, ti.end_date) {
                out.push(TaskDurationInfo {
                    dag_id: ti.dag_id.clone(),
                    task_id: ti.task_id.clone(),
                    start_date,
                    end_date,
                    execution_date: ti.execution_date,
                });
            }
        }
    }
    Ok(out)
}

// ── Failures ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskFailInfo {
    pub dag_id: DagId,
    pub task_id: TaskId,
    pub count: u64,
}

pub fn task_failure_counts(store: &dyn WorkflowStore) -> StateResult<Vec<TaskFailInfo>> {
    let owners = live_owners(store)?;
    let mut counts: BTreeMap<(DagId, TaskId), u64> = BTreeMap::new();
    for fail in store.task_failures()? {
        if owners.contains_key(&fail.dag_id) {
            *counts.entry((fail.dag_id, fail.task_id)).or_default() += 1;
        }
    }
    Ok(counts
        .into_iter()
        .map(|((dag_id, task_id), count)| TaskFailInfo {
            dag_id,
            task_id,
            count,
        })
        .collect())
}

// ── Scheduler ─────────────────────────────────────────────────────

/// Delay between a run's logical date and its actual start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagSchedulerDelay {
    pub dag_id: DagId,
    pub execution_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
}

impl DagSchedulerDelay {
    pub fn seconds(&self) -> f64 {
        seconds_between(self.execution_date, self.start_date)
    }
}

/// Scheduling delay of the most recent successful run (at most one entry).
///
/// Empty when that run has no start date, even if an older run has one.
pub fn dag_scheduler_delay(store: &dyn WorkflowStore) -> StateResult<Vec<DagSchedulerDelay>> {
    let mut latest: Option<DagRunRecord> = None;
    for run in store.dag_runs()? {
        if state_of(&run.state)? != ProcessingState::Success {
            continue;
        }
        if latest
            .as_ref()
            .is_none_or(|l| run.execution_date > l.execution_date)
        {
            latest = Some(run);
        }
    }
    Ok(latest
        .and_then(|run| {
            let start_date = run.start_date?;
            Some(DagSchedulerDelay {
                dag_id: run.dag_id,
                execution_date: run.execution_date,
                start_date,
            })
        })
        .into_iter()
        .collect())
}

/// Delay between queueing and starting the most recently started
/// successful task of a queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSchedulerDelay {
    pub queue: String,
    pub queued_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
}

impl TaskSchedulerDelay {
    pub fn seconds(&self) -> f64 {
        seconds_between(self.queued_at, self.start_date)
    }
}

pub fn task_scheduler_delay(store: &dyn WorkflowStore) -> StateResult<Vec<TaskSchedulerDelay>> {
    let mut by_queue: BTreeMap<String, TaskSchedulerDelay> = BTreeMap::new();
    for ti in store.task_instances()? {
        if state_of(&ti.state)? != ProcessingState::Success {
            continue;
        }
        let (Some(queued_at), Some(start_date)) = (ti.queued_at, ti.start_date) else {
            continue;
        };
        match by_queue.get(&ti.queue) {
            Some(prev) if prev.start_date >= start_date => {}
            _ => {
                by_queue.insert(
                    ti.queue.clone(),
                    TaskSchedulerDelay {
                        queue: ti.queue,
                        queued_at,
                        start_date,
                    },
                );
            }
        }
    }
    Ok(by_queue.into_values().collect())
}

/// Task instances currently waiting in a queue.
pub fn num_queued_tasks(store: &dyn WorkflowStore) -> StateResult<u64> {
    let mut queued = 0;
    for ti in store.task_instances()? {
        if state_of(&ti.state)? == ProcessingState::Queued {
            queued += 1;
        }
    }
    Ok(queued)
}

// ── DAG bag ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DagBagInfo {
    pub loaded_dags_count: u64,
    /// Task count per operator class.
    pub tasks: BTreeMap<String, u64>,
}

pub fn dag_bag_info(store: &dyn WorkflowStore) -> StateResult<DagBagInfo> {
    let mut info = DagBagInfo::default();
    for dag in store.dags()? {
        info.loaded_dags_count += 1;
        for task in dag.tasks {
            *info.tasks.entry(task.operator).or_default() += 1;
        }
    }
    Ok(info)
}

// ── XCom ──────────────────────────────────────────────────────────

/// XCom values pushed during each DAG's latest run, for one task id or
/// `"all"`.
pub fn xcom_params(store: &dyn WorkflowStore, task_id: &str) -> StateResult<Vec<XComRecord>> {
    let runs = store.dag_runs()?;
    let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for run in &runs {
        let entry = latest.entry(run.dag_id.as_str()).or_insert(run.execution_date);
        if run.execution_date > *entry {
            *entry = run.execution_date;
        }
    }
    Ok(store
        .xcoms()?
        .into_iter()
        .filter(|x| latest.get(x.dag_id.as_str()) == Some(&x.execution_date))
        .filter(|x| task_id == "all" || x.task_id == task_id)
        .collect())
}
