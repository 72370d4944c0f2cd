//! flowlens-state: read-only view of a workflow engine's records.
//!
//! Provides the record types (DAGs, runs, task instances, failures, XComs),
//! the [`WorkflowStore`] trait the rest of Flowlens reads through, a
//! snapshot-backed [`MemoryStore`], the [`ProcessingState`] normalizer, and
//! aggregate run statistics.
//!
//! # Architecture
//!
//! ```text
//! WorkflowStore (trait)
//!   └── MemoryStore ← Snapshot (JSON file or built in code)
//!
//! stats::* ── fold records into summaries, classifying every raw
//!             state through to_processing_state()
//! ```

pub mod error;
pub mod state;
pub mod stats;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use state::{ProcessingState, to_processing_state};
pub use store::{MemoryStore, WorkflowStore};
pub use types::*;
