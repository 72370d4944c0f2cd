//! Request orchestration for `search`, `query`, `annotations` and `panels`.
//!
//! ```text
//!  target ──► Target::parse ──► Registry lookup ──► producer(arg, range)
//!                                                        │
//!             FilterSet::apply ◄─────────────────────────┘
//!                   │
//!                   └──► shape (table | time series | annotations)
//! ```
//!
//! The engine is synchronous and framework-free; the HTTP layer calls it
//! directly from its handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterSet;
use crate::protocol::{AnnotationRequest, PanelParams, QueryRequest, SearchRequest, TargetSpec};
use crate::registry::{MetricReader, PanelContent, Registry};
use crate::shape::{self, AnnotationEntry, ResponseKind, ShapedEntry};
use crate::target::{self, Target};

/// Target queried when a `query` request names none.
pub const DEFAULT_TARGET: &str = "dags";

#[derive(Debug, Clone)]
pub struct QueryEngine {
    registry: Arc<Registry>,
    default_target: String,
}

impl QueryEngine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            default_target: DEFAULT_TARGET.to_string(),
        }
    }

    pub fn with_default_target(mut self, target: impl Into<String>) -> Self {
        self.default_target = target.into();
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ── search ─────────────────────────────────────────────────

    /// Discover queryable targets.
    ///
    /// A wildcard lists every reader name plus everything every finder
    /// yields for the wildcard. `finder:arg` asks that finder. Anything else
    /// is echoed back unchanged.
    pub fn search(&self, req: &SearchRequest) -> QueryResult<Vec<String>> {
        let text = req.target.as_deref().unwrap_or_default();

        if target::is_wildcard(text) {
            let mut found: BTreeSet<String> =
                self.registry.reader_names().map(str::to_string).collect();
            for (name, finder) in self.registry.finders() {
                debug!(finder = name, "search: wildcard");
                found.extend(
                    finder
                        .find(target::WILDCARD)
                        .map_err(QueryError::from_producer)?,
                );
            }
            return Ok(found.into_iter().collect());
        }

        if let Some((source, argument)) = text.split_once(target::SEPARATOR) {
            if let Ok(finder) = self.registry.finder(source) {
                debug!(finder = source, argument, "search: finder");
                let found: BTreeSet<String> = finder
                    .find(argument)
                    .map_err(QueryError::from_producer)?
                    .into_iter()
                    .collect();
                return Ok(found.into_iter().collect());
            }
        }

        Ok(vec![text.to_string()])
    }

    // ── query ──────────────────────────────────────────────────

    /// Run every target and flatten the shaped results.
    pub fn query(&self, req: &QueryRequest) -> QueryResult<Vec<ShapedEntry>> {
        let filters = FilterSet::new(req.adhoc_filters.clone())?;
        let range = req.range.clone().unwrap_or_default().normalize()?;

        let defaults;
        let targets: &[TargetSpec] = match &req.targets {
            Some(targets) => targets,
            None => {
                defaults = [TargetSpec::table(self.default_target.as_str())];
                &defaults
            }
        };

        // Resolve every reader before any of them runs.
        let resolved = targets
            .iter()
            .map(|spec| {
                let parsed = Target::parse(&spec.target);
                let reader = self.registry.metric_reader(parsed.source)?;
                Ok((spec, parsed, reader))
            })
            .collect::<QueryResult<Vec<(&TargetSpec, Target<'_>, &dyn MetricReader)>>>()?;

        let mut response = Vec::new();
        for (spec, parsed, reader) in resolved {
            debug!(
                source = parsed.source,
                argument = parsed.argument,
                filters = filters.len(),
                "query: dispatch"
            );
            let output = reader
                .read(parsed.argument, &range)
                .map_err(QueryError::from_producer)?;
            let output = filters.apply(output);
            let kind = ResponseKind::from_type(spec.kind.as_deref());
            response.extend(shape::shape(output, kind, &spec.target, req.interval_ms)?);
        }
        Ok(response)
    }

    // ── annotations ────────────────────────────────────────────

    pub fn annotations(&self, req: &AnnotationRequest) -> QueryResult<Vec<AnnotationEntry>> {
        let parsed = Target::split_required(req.query())?;
        let range = req.range.clone().unwrap_or_default().normalize()?;
        let reader = self.registry.annotation_reader(parsed.source)?;

        debug!(source = parsed.source, argument = parsed.argument, "annotations: dispatch");
        let events = reader
            .annotations(parsed.argument, &range)
            .map_err(QueryError::from_producer)?;
        let annotation = match &req.annotation {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };
        Ok(shape::shape_annotations(events, &annotation, &range))
    }

    // ── panels ─────────────────────────────────────────────────

    pub fn panel(&self, params: &PanelParams) -> QueryResult<PanelContent> {
        let parsed = Target::split_required(&params.query)?;
        let range = params.raw_range().normalize()?;
        let reader = self.registry.panel_reader(parsed.source)?;

        debug!(source = parsed.source, argument = parsed.argument, "panels: dispatch");
        reader
            .render(parsed.argument, &range)
            .map_err(QueryError::from_producer)
    }
}
