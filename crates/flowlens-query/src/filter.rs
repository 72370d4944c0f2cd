//! Ad-hoc equality filters.
//!
//! Filters are validated as a set before any producer runs, then applied
//! in order to every table of a [`QueryOutput`]. Only `=` is supported.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{QueryError, QueryResult};
use crate::table::{NamedTable, QueryOutput};

/// The only supported operator.
pub const EQUALS: &str = "=";

/// A caller-supplied `key <operator> value` predicate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdHocFilter {
    pub key: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl AdHocFilter {
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator: EQUALS.to_string(),
            value: value.into(),
        }
    }
}

/// A validated list of equality filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<AdHocFilter>,
}

impl FilterSet {
    /// Validate every operator up front; one bad filter rejects the set.
    pub fn new(filters: Vec<AdHocFilter>) -> QueryResult<Self> {
        if let Some(bad) = filters.iter().find(|f| f.operator != EQUALS) {
            return Err(QueryError::UnsupportedOperator {
                key: bad.key.clone(),
                operator: bad.operator.clone(),
            });
        }
        Ok(Self { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Intersect every table of `output` with all filters.
    pub fn apply(&self, output: QueryOutput) -> QueryOutput {
        if self.filters.is_empty() {
            return output;
        }
        match output {
            QueryOutput::Single(table) => QueryOutput::Single(
                self.filters
                    .iter()
                    .fold(table, |t, f| t.retain_eq(&f.key, &f.value)),
            ),
            QueryOutput::Named(tables) => QueryOutput::Named(
                tables
                    .into_iter()
                    .map(|named| NamedTable {
                        table: self
                            .filters
                            .iter()
                            .fold(named.table, |t, f| t.retain_eq(&f.key, &f.value)),
                        ..named
                    })
                    .collect(),
            ),
        }
    }
}
