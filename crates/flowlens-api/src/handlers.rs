//! Datasource and exposition handlers.
//!
//! JSON bodies are read raw so that a missing or empty body means "no
//! request body" rather than a rejection. Engine errors map to
//! `{"success": false, "error": ...}` with a status per error kind.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use flowlens_query::{
    AnnotationRequest, PanelParams, QueryError, QueryRequest, SearchRequest, TagValuesRequest,
};

use crate::ApiState;

const GREETING: &str = "Flowlens simple-JSON datasource, \
    serving workflow graphs, tables, annotations and HTML panels.";

/// Error body.
#[derive(serde::Serialize)]
struct ApiError {
    success: bool,
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiError {
            success: false,
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn status_of(err: &QueryError) -> StatusCode {
    match err {
        QueryError::UnknownSource { .. } | QueryError::MalformedQuery(_) => StatusCode::NOT_FOUND,
        QueryError::UnsupportedOperator { .. }
        | QueryError::InvalidRange(_)
        | QueryError::NotTimeSeries(_)
        | QueryError::BadRequest(_) => StatusCode::BAD_REQUEST,
        QueryError::InvalidTable(_) | QueryError::State(_) | QueryError::Producer(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn query_error(endpoint: &'static str, err: QueryError) -> Response {
    let status = status_of(&err);
    let msg = err.to_string();
    if status.is_server_error() {
        error!(endpoint, status = status.as_u16(), error = %msg, "request failed");
    } else {
        warn!(endpoint, status = status.as_u16(), error = %msg, "request rejected");
    }
    error_response(&msg, status)
}

/// Decode a JSON body; an empty body yields the default request.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, QueryError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| QueryError::BadRequest(e.to_string()))
}

// ── Datasource ─────────────────────────────────────────────────

/// GET|POST {prefix}/
pub async fn hello() -> &'static str {
    GREETING
}

/// GET|POST {prefix}/search
pub async fn search(State(state): State<ApiState>, body: Bytes) -> Response {
    match parse_body::<SearchRequest>(&body).and_then(|req| state.engine.search(&req)) {
        Ok(targets) => Json(targets).into_response(),
        Err(e) => query_error("search", e),
    }
}

/// GET|POST {prefix}/query
pub async fn query(State(state): State<ApiState>, body: Bytes) -> Response {
    match parse_body::<QueryRequest>(&body).and_then(|req| state.engine.query(&req)) {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => query_error("query", e),
    }
}

/// GET|POST {prefix}/annotations
pub async fn annotations(State(state): State<ApiState>, body: Bytes) -> Response {
    match parse_body::<AnnotationRequest>(&body).and_then(|req| state.engine.annotations(&req)) {
        Ok(events) => Json(events).into_response(),
        Err(e) => query_error("annotations", e),
    }
}

/// GET|POST {prefix}/panels?query=<source>:<arg>&from=<ms>&to=<ms>
pub async fn panels(State(state): State<ApiState>, Query(params): Query<PanelParams>) -> Response {
    match state.engine.panel(&params) {
        Ok(panel) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, panel.content_type)],
            panel.body,
        )
            .into_response(),
        Err(e) => query_error("panels", e),
    }
}

// ── Ad-hoc filters ─────────────────────────────────────────────

/// GET|POST {prefix}/tag-keys
pub async fn tag_keys() -> impl IntoResponse {
    Json(flowlens_sources::tag_keys())
}

/// GET|POST {prefix}/tag-values
pub async fn tag_values(State(state): State<ApiState>, body: Bytes) -> Response {
    let values = parse_body::<TagValuesRequest>(&body).and_then(|req| {
        flowlens_sources::tag_values(state.store.as_ref(), &req.key).map_err(QueryError::from)
    });
    match values {
        Ok(values) => Json(values).into_response(),
        Err(e) => query_error("tag-values", e),
    }
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> Response {
    match state.metrics.collect() {
        Ok(families) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, flowlens_metrics::CONTENT_TYPE)],
            flowlens_metrics::render_prometheus(&families),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "metrics collection failed");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
