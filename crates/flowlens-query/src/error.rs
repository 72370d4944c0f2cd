//! Query engine error types.

use std::fmt;

use thiserror::Error;

/// Which registry surface a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    MetricReader,
    Finder,
    AnnotationReader,
    PanelReader,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::MetricReader => "metric reader",
            SourceKind::Finder => "metric finder",
            SourceKind::AnnotationReader => "annotation reader",
            SourceKind::PanelReader => "panel reader",
        })
    }
}

/// Errors raised while dispatching and shaping a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unknown data source: no {kind} named {name:?}")]
    UnknownSource { kind: SourceKind, name: String },

    #[error("Target must be of type: <finder>:<metric_query>, got instead: {0}")]
    MalformedQuery(String),

    #[error("unsupported ad-hoc filter operator {operator:?} on key {key:?}, only \"=\" is supported")]
    UnsupportedOperator { key: String, operator: String },

    #[error("invalid time range bound: {0}")]
    InvalidRange(String),

    #[error("result {0:?} has no time column and cannot be shaped as a time series")]
    NotTimeSeries(String),

    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    State(#[from] flowlens_state::StateError),

    #[error("producer failed: {0:#}")]
    Producer(anyhow::Error),
}

impl QueryError {
    /// Wrap a producer failure, surfacing typed state errors as such.
    pub fn from_producer(err: anyhow::Error) -> Self {
        match err.downcast::<flowlens_state::StateError>() {
            Ok(state) => QueryError::State(state),
            Err(err) => match err.downcast::<QueryError>() {
                Ok(query) => query,
                Err(err) => QueryError::Producer(err),
            },
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
