//! Error types for the workflow store.

use thiserror::Error;

/// Result type alias for store and statistics operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading workflow records.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open snapshot: {0}")]
    Open(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("unrecognized processing state: {0:?}")]
    UnrecognizedState(String),
}
