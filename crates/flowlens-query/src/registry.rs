//! Metric registry: named producers for the four query surfaces.
//!
//! Producers are registered on a [`RegistryBuilder`] during start-up. The
//! builder is then consumed into an immutable [`Registry`] that request
//! handlers share behind an `Arc`; lookups need no locking.
//!
//! Every producer trait has a blanket impl for plain closures, so a source
//! can register either a struct or a `move |arg, range| ...` closure.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult, SourceKind};
use crate::range::TimeRange;
use crate::shape::AnnotationEvent;
use crate::table::QueryOutput;

/// Produces table(s) for `(argument, range)`.
pub trait MetricReader: Send + Sync {
    fn read(&self, argument: &str, range: &TimeRange) -> anyhow::Result<QueryOutput>;
}

impl<F> MetricReader for F
where
    F: Fn(&str, &TimeRange) -> anyhow::Result<QueryOutput> + Send + Sync,
{
    fn read(&self, argument: &str, range: &TimeRange) -> anyhow::Result<QueryOutput> {
        self(argument, range)
    }
}

/// Enumerates discoverable metric identifiers.
pub trait MetricFinder: Send + Sync {
    fn find(&self, argument: &str) -> anyhow::Result<Vec<String>>;
}

impl<F> MetricFinder for F
where
    F: Fn(&str) -> anyhow::Result<Vec<String>> + Send + Sync,
{
    fn find(&self, argument: &str) -> anyhow::Result<Vec<String>> {
        self(argument)
    }
}

/// Produces annotation events for `(argument, range)`.
pub trait AnnotationReader: Send + Sync {
    fn annotations(&self, argument: &str, range: &TimeRange)
    -> anyhow::Result<Vec<AnnotationEvent>>;
}

impl<F> AnnotationReader for F
where
    F: Fn(&str, &TimeRange) -> anyhow::Result<Vec<AnnotationEvent>> + Send + Sync,
{
    fn annotations(
        &self,
        argument: &str,
        range: &TimeRange,
    ) -> anyhow::Result<Vec<AnnotationEvent>> {
        self(argument, range)
    }
}

/// Raw rendered panel content; the reader owns its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelContent {
    pub content_type: String,
    pub body: String,
}

impl PanelContent {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.into(),
        }
    }
}

/// Renders a panel for `(argument, range)`.
pub trait PanelReader: Send + Sync {
    fn render(&self, argument: &str, range: &TimeRange) -> anyhow::Result<PanelContent>;
}

impl<F> PanelReader for F
where
    F: Fn(&str, &TimeRange) -> anyhow::Result<PanelContent> + Send + Sync,
{
    fn render(&self, argument: &str, range: &TimeRange) -> anyhow::Result<PanelContent> {
        self(argument, range)
    }
}

fn insert<T: ?Sized>(map: &mut HashMap<String, Arc<T>>, kind: SourceKind, name: String, p: Arc<T>) {
    if map.insert(name.clone(), p).is_some() {
        warn!(%kind, %name, "producer registered twice, replacing the earlier one");
    } else {
        debug!(%kind, %name, "producer registered");
    }
}

/// Mutable registration surface, used only during start-up.
#[derive(Default)]
pub struct RegistryBuilder {
    readers: HashMap<String, Arc<dyn MetricReader>>,
    finders: HashMap<String, Arc<dyn MetricFinder>>,
    annotations: HashMap<String, Arc<dyn AnnotationReader>>,
    panels: HashMap<String, Arc<dyn PanelReader>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_metric_reader(
        &mut self,
        name: impl Into<String>,
        reader: impl MetricReader + 'static,
    ) -> &mut Self {
        insert(&mut self.readers, SourceKind::MetricReader, name.into(), Arc::new(reader));
        self
    }

    pub fn register_finder(
        &mut self,
        name: impl Into<String>,
        finder: impl MetricFinder + 'static,
    ) -> &mut Self {
        insert(&mut self.finders, SourceKind::Finder, name.into(), Arc::new(finder));
        self
    }

    pub fn register_annotation_reader(
        &mut self,
        name: impl Into<String>,
        reader: impl AnnotationReader + 'static,
    ) -> &mut Self {
        insert(
            &mut self.annotations,
            SourceKind::AnnotationReader,
            name.into(),
            Arc::new(reader),
        );
        self
    }

    pub fn register_panel_reader(
        &mut self,
        name: impl Into<String>,
        reader: impl PanelReader + 'static,
    ) -> &mut Self {
        insert(&mut self.panels, SourceKind::PanelReader, name.into(), Arc::new(reader));
        self
    }

    /// Freeze the registrations.
    pub fn build(self) -> Registry {
        Registry {
            readers: self.readers,
            finders: self.finders,
            annotations: self.annotations,
            panels: self.panels,
        }
    }
}

/// Immutable name → producer lookup tables.
pub struct Registry {
    readers: HashMap<String, Arc<dyn MetricReader>>,
    finders: HashMap<String, Arc<dyn MetricFinder>>,
    annotations: HashMap<String, Arc<dyn AnnotationReader>>,
    panels: HashMap<String, Arc<dyn PanelReader>>,
}

fn lookup<'a, T: ?Sized>(
    map: &'a HashMap<String, Arc<T>>,
    kind: SourceKind,
    name: &str,
) -> QueryResult<&'a T> {
    map.get(name)
        .map(|p| p.as_ref())
        .ok_or_else(|| QueryError::UnknownSource {
            kind,
            name: name.to_string(),
        })
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn metric_reader(&self, name: &str) -> QueryResult<&dyn MetricReader> {
        lookup(&self.readers, SourceKind::MetricReader, name)
    }

    pub fn finder(&self, name: &str) -> QueryResult<&dyn MetricFinder> {
        lookup(&self.finders, SourceKind::Finder, name)
    }

    pub fn annotation_reader(&self, name: &str) -> QueryResult<&dyn AnnotationReader> {
        lookup(&self.annotations, SourceKind::AnnotationReader, name)
    }

    pub fn panel_reader(&self, name: &str) -> QueryResult<&dyn PanelReader> {
        lookup(&self.panels, SourceKind::PanelReader, name)
    }

    pub fn has_finder(&self, name: &str) -> bool {
        self.finders.contains_key(name)
    }

    /// Names of all registered metric readers, in no particular order.
    pub fn reader_names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(String::as_str)
    }

    pub fn finders(&self) -> impl Iterator<Item = (&str, &dyn MetricFinder)> {
        self.finders.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |map: Vec<&String>| {
            let mut v: Vec<_> = map.into_iter().cloned().collect();
            v.sort();
            v
        };
        f.debug_struct("Registry")
            .field("readers", &names(self.readers.keys().collect()))
            .field("finders", &names(self.finders.keys().collect()))
            .field("annotations", &names(self.annotations.keys().collect()))
            .field("panels", &names(self.panels.keys().collect()))
            .finish()
    }
}
