//! Target strings: `"<source>:<argument>"`.

use crate::error::{QueryError, QueryResult};

/// Separator between the source name and its argument.
pub const SEPARATOR: char = ':';

/// Wildcard target meaning "enumerate everything".
pub const WILDCARD: &str = "*";

/// A parsed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target<'a> {
    /// Registry key.
    pub source: &'a str,
    /// Passed verbatim to the producer.
    pub argument: &'a str,
}

impl<'a> Target<'a> {
    /// Split on the first `:`. Without a separator the whole string is both
    /// the source name and the argument.
    pub fn parse(text: &'a str) -> Self {
        match text.split_once(SEPARATOR) {
            Some((source, argument)) => Target { source, argument },
            None => Target {
                source: text,
                argument: text,
            },
        }
    }

    /// Strict split used by annotations and panels: the separator is
    /// mandatory.
    pub fn split_required(text: &'a str) -> QueryResult<Self> {
        text.split_once(SEPARATOR)
            .map(|(source, argument)| Target { source, argument })
            .ok_or_else(|| QueryError::MalformedQuery(text.to_string()))
    }
}

/// Empty string or `*`.
pub fn is_wildcard(text: &str) -> bool {
    text.is_empty() || text == WILDCARD
}
