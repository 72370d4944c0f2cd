//! HTTP regression tests.
//!
//! Drives the full router over a snapshot file the way the daemon wires it:
//! datasource endpoints under the default prefix plus `/metrics`.

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use flowlens_api::{ApiState, build_router};
use flowlens_core::{FlowlensConfig, XcomParam};
use flowlens_metrics::MetricsCollector;
use flowlens_query::{QueryEngine, Registry};
use flowlens_state::{MemoryStore, WorkflowStore};
use serde_json::{Value, json};
use tower::ServiceExt;

const FIXTURE: &str = include_str!("../../../tests/fixtures/snapshot.json");

fn test_router() -> Router {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FIXTURE.as_bytes()).unwrap();
    let store: Arc<dyn WorkflowStore> = Arc::new(MemoryStore::open(file.path()).unwrap());

    let mut builder = Registry::builder();
    flowlens_sources::register_builtin(&mut builder, store.clone());
    let config = FlowlensConfig::default();
    let state = ApiState {
        engine: QueryEngine::new(Arc::new(builder.build()))
            .with_default_target(config.server.default_target.clone()),
        metrics: Arc::new(MetricsCollector::new(
            store.clone(),
            vec![XcomParam {
                task_id: "all".to_string(),
                key: "rows".to_string(),
            }],
        )),
        store,
    };
    build_router(state, &config.server.normalized_prefix())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn greeting_with_and_without_trailing_slash() {
    let router = test_router();
    for uri in ["/metrics/json", "/metrics/json/"] {
        let resp = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let text = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(text.contains("Flowlens"));
    }
}

#[tokio::test]
async fn search_via_get_without_body() {
    let resp = test_router()
        .oneshot(get("/metrics/json/search"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let targets: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(
        targets,
        json!(["dag_runs", "dags", "dags:etl", "dags:legacy", "dags:report", "task_states"])
    );
}

#[tokio::test]
async fn search_asks_the_named_finder() {
    let resp = test_router()
        .oneshot(post("/metrics/json/search", json!({"target": "dags:e"})))
        .await
        .unwrap();
    let targets: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(targets, json!(["dags", "dags:etl"]));
}

#[tokio::test]
async fn default_query_is_the_node_graph() {
    let resp = test_router()
        .oneshot(post("/metrics/json/query", json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let entries: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    let names: Vec<_> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["nodes", "edges"]);
    assert_eq!(entries[0]["meta"]["preferredVisualisationType"], json!("nodeGraph"));
}

#[tokio::test]
async fn time_series_query_in_range() {
    let req = json!({
        "targets": [{"target": "dag_runs:etl", "type": "timeserie"}],
        "range": {"from": "2023-12-31T00:00:00Z", "to": "2024-01-03T00:00:00Z"},
        "intervalMs": 60000
    });
    let resp = test_router()
        .oneshot(post("/metrics/json/query", req))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let entries: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(entries[0]["target"], json!("etl"));
    assert_eq!(
        entries[0]["datapoints"],
        json!([[600.0, 1_704_067_200_000_i64], [300.0, 1_704_153_600_000_i64]])
    );
}

#[tokio::test]
async fn malformed_annotation_query_is_not_found() {
    let resp = test_router()
        .oneshot(post(
            "/metrics/json/annotations",
            json!({"annotation": {"query": "dag_runs"}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err["success"], json!(false));
    assert_eq!(
        err["error"],
        json!("Target must be of type: <finder>:<metric_query>, got instead: dag_runs")
    );
}

#[tokio::test]
async fn panel_over_query_string() {
    let resp = test_router()
        .oneshot(get(
            "/metrics/json/panels?query=dag:report&from=1704067200000&to=1704240000000",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("<h3>report</h3>"));
    assert!(html.contains("running"));
}

#[tokio::test]
async fn unknown_panel_reader_is_not_found() {
    let resp = test_router()
        .oneshot(get("/metrics/json/panels?query=chart:etl"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn prometheus_exposition() {
    let resp = test_router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(content_type, "text/plain; version=0.0.4; charset=utf-8");

    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(text.contains("# TYPE dag_bag_stats counter"));
    assert!(text.contains("dag_bag_stats{property=\"loaded_dags_count\"} 3\n"));
    assert!(text.contains("airflow_xcom_parameter{dag_id=\"etl\",task_id=\"extract\"} 500\n"));
    assert!(text.contains("airflow_task_fail_count{dag_id=\"etl\",task_id=\"transform\"} 1\n"));
    assert!(!text.contains("task_id=\"cleanup\"} 1\n"));
}
