//! flowlens-api: HTTP API for Flowlens.
//!
//! Serves the simple-JSON datasource protocol under a configurable prefix
//! plus the Prometheus exposition at `/metrics`. Every datasource route
//! accepts both GET and POST.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET, POST | `{prefix}`, `{prefix}/` | Datasource greeting |
//! | GET, POST | `{prefix}/search` | List queryable targets |
//! | GET, POST | `{prefix}/query` | Time series / table query |
//! | GET, POST | `{prefix}/annotations` | Annotation events |
//! | GET, POST | `{prefix}/panels` | Raw panel content |
//! | GET, POST | `{prefix}/tag-keys` | Ad-hoc filter keys |
//! | GET, POST | `{prefix}/tag-values` | Values of one filter key |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use flowlens_metrics::MetricsCollector;
use flowlens_query::QueryEngine;
use flowlens_state::WorkflowStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: QueryEngine,
    pub store: Arc<dyn WorkflowStore>,
    pub metrics: Arc<MetricsCollector>,
}

/// Build the complete router. `prefix` is already normalized: a leading
/// slash, no trailing slash, or empty for the root.
pub fn build_router(state: ApiState, prefix: &str) -> Router {
    let mut router = Router::new()
        .route(&format!("{prefix}/"), get(handlers::hello).post(handlers::hello))
        .route(
            &format!("{prefix}/search"),
            get(handlers::search).post(handlers::search),
        )
        .route(
            &format!("{prefix}/query"),
            get(handlers::query).post(handlers::query),
        )
        .route(
            &format!("{prefix}/annotations"),
            get(handlers::annotations).post(handlers::annotations),
        )
        .route(
            &format!("{prefix}/panels"),
            get(handlers::panels).post(handlers::panels),
        )
        .route(
            &format!("{prefix}/tag-keys"),
            get(handlers::tag_keys).post(handlers::tag_keys),
        )
        .route(
            &format!("{prefix}/tag-values"),
            get(handlers::tag_values).post(handlers::tag_values),
        );

    // `/metrics` belongs to the exposition.
    if !prefix.is_empty() && prefix != "/metrics" {
        router = router.route(prefix, get(handlers::hello).post(handlers::hello));
    }

    router
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
