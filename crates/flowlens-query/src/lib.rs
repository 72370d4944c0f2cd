//! flowlens-query: target dispatch and response shaping for the
//! simple-JSON datasource protocol.
//!
//! ```text
//!   RegistryBuilder ──build──► Arc<Registry> ──► QueryEngine
//!                                                   │
//!         search / query / annotations / panels ◄───┘
//! ```
//!
//! Producers registered on the [`Registry`] return [`TabularResult`]s (or
//! named lists of them); the engine filters them with a [`FilterSet`] and
//! shapes them into time series, tables, annotations or node graphs.

pub mod engine;
pub mod error;
pub mod filter;
pub mod graph;
pub mod protocol;
pub mod range;
pub mod registry;
pub mod shape;
pub mod table;
pub mod target;

pub use engine::{DEFAULT_TARGET, QueryEngine};
pub use error::{QueryError, QueryResult, SourceKind};
pub use filter::{AdHocFilter, FilterSet};
pub use graph::{NodeBucket, OutcomeMap, RunOutcome, WorkUnit, build_node_graph};
pub use protocol::{
    AnnotationRequest, PanelParams, QueryRequest, SearchRequest, TagValuesRequest, TargetSpec,
};
pub use range::{RawRange, RawTime, TimeRange};
pub use registry::{
    AnnotationReader, MetricFinder, MetricReader, PanelContent, PanelReader, Registry,
    RegistryBuilder,
};
pub use shape::{AnnotationEntry, AnnotationEvent, ShapedEntry};
pub use table::{FrameMeta, NamedTable, QueryOutput, TIME_COLUMN, TabularResult};
pub use target::Target;
