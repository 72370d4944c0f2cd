//! flowlens-metrics: Prometheus exposition of workflow statistics.
//!
//! # Architecture
//!
//! ```text
//! MetricsCollector
//!   ├── dag_families()        airflow_dag_status, airflow_dag_run_duration
//!   ├── task_families()       airflow_task_*, airflow_last_dag_run, airflow_xcom_parameter, ...
//!   ├── scheduler_families()  airflow_dag_scheduler_delay
//!   └── dag_bag_families()    dag_bag_stats
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```
//!
//! Families are recomputed from the store on every scrape; nothing is
//! cached between scrapes.

pub mod collector;
pub mod prometheus;

pub use collector::{MetricFamily, MetricKind, MetricsCollector, Sample};
pub use prometheus::{CONTENT_TYPE, render_prometheus};
