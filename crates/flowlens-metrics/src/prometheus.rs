//! Prometheus text exposition format.
//!
//! Renders collected metric families into the text format scraped by a
//! Prometheus server or compatible agent.

use std::fmt::Write;

use crate::collector::{MetricFamily, Sample};

/// Content type of the exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render metric families into Prometheus text format.
///
/// Each family gets its HELP and TYPE lines even when it has no samples.
pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut out = String::new();
    for family in families {
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(family.help));
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());
        for sample in &family.samples {
            render_sample(&mut out, family.name, sample);
        }
    }
    out
}

fn render_sample(out: &mut String, name: &str, sample: &Sample) {
    out.push_str(name);
    if !sample.labels.is_empty() {
        out.push('{');
        for (i, (key, value)) in sample.labels.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{key}=\"{}\"", escape_label(value));
        }
        out.push('}');
    }
    let _ = writeln!(out, " {}", format_value(sample.value));
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MetricKind;

    fn status_family() -> MetricFamily {
        let mut family =
            MetricFamily::gauge("airflow_dag_status", "Shows the number of dag starts");
        family.add(
            vec![
                ("dag_id", "etl".to_string()),
                ("owner", "ops".to_string()),
                ("status", "success".to_string()),
            ],
            3.0,
        );
        family.add(
            vec![
                ("dag_id", "report".to_string()),
                ("owner", "analytics".to_string()),
                ("status", "failed".to_string()),
            ],
            1.0,
        );
        family
    }

    #[test]
    fn render_empty() {
        let output = render_prometheus(&[MetricFamily::gauge(
            "airflow_task_fail_count",
            "Count of failed tasks",
        )]);
        // Should still have type declarations.
        assert_eq!(
            output,
            "# HELP airflow_task_fail_count Count of failed tasks\n\
             # TYPE airflow_task_fail_count gauge\n"
        );
    }

    #[test]
    fn render_labelled_samples() {
        let output = render_prometheus(&[status_family()]);
        assert!(output.contains("# TYPE airflow_dag_status gauge"));
        assert!(output.contains(
            "airflow_dag_status{dag_id=\"etl\",owner=\"ops\",status=\"success\"} 3\n"
        ));
        assert!(output.contains(
            "airflow_dag_status{dag_id=\"report\",owner=\"analytics\",status=\"failed\"} 1\n"
        ));
    }

    #[test]
    fn render_counter_and_unlabelled() {
        let mut stats = MetricFamily::counter("dag_bag_stats", "Dag bag stats");
        stats.add(vec![("property", "loaded_dags_count".to_string())], 3.0);
        let mut queued = MetricFamily::gauge("airflow_num_queued_tasks", "Queued");
        queued.add(Vec::new(), 0.0);

        let output = render_prometheus(&[stats, queued]);
        assert!(output.contains("# TYPE dag_bag_stats counter"));
        assert!(output.contains("dag_bag_stats{property=\"loaded_dags_count\"} 3\n"));
        assert!(output.contains("\nairflow_num_queued_tasks 0\n"));
        assert_eq!(MetricKind::Counter.as_str(), "counter");
    }

    #[test]
    fn fractional_and_special_values() {
        let mut family = MetricFamily::gauge("airflow_task_duration", "Durations");
        family.add(vec![("aggregation", "avg".to_string())], 90.5);
        family.add(vec![("aggregation", "max".to_string())], f64::INFINITY);
        family.add(vec![("aggregation", "min".to_string())], f64::NAN);
        let output = render_prometheus(&[family]);
        assert!(output.contains("{aggregation=\"avg\"} 90.5\n"));
        assert!(output.contains("{aggregation=\"max\"} +Inf\n"));
        assert!(output.contains("{aggregation=\"min\"} NaN\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        let mut family = MetricFamily::gauge("airflow_last_dag_run", "Latest\nrun");
        family.add(vec![("task_id", "say \"hi\"\\\n".to_string())], 1.0);
        let output = render_prometheus(&[family]);
        assert!(output.contains("# HELP airflow_last_dag_run Latest\\nrun\n"));
        assert!(output.contains("task_id=\"say \\\"hi\\\"\\\\\\n\""));
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let output = render_prometheus(&[status_family()]);

        // Every non-comment line should be: metric_name{labels} value
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (series, value) = line.rsplit_once(' ').expect("sample line has a value");
            assert!(series.contains('{') && series.ends_with('}'), "{line}");
            assert!(value.parse::<f64>().is_ok(), "{line}");
        }
    }
}
