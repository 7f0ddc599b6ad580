//! Query descriptors and the interpreter seam that produces them.
//!
//! Parsing the query mini-language is left to an external collaborator.
//! This module only fixes the shape of its output and the trait the client
//! calls it through.

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Search string used when a descriptor carries none.
pub const WILDCARD: &str = "*";

/// Structured result of parsing a free-text query.
///
/// Descriptors are never mutated by the client; all default resolution
/// happens in accessor methods taking `&self`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// The normalized search expression.
    #[serde(default, rename = "string", skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,
    /// Page sizes; only the first is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Vec<u64>>,
    /// Sort clauses in `field:direction` form; only the first is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    /// Fields to keep in normalized records, in output order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl QueryDescriptor {
    /// Creates an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search expression.
    #[must_use]
    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    /// Appends a page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit.get_or_insert_with(Vec::new).push(limit);
        self
    }

    /// Appends a sort clause.
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort.get_or_insert_with(Vec::new).push(sort.into());
        self
    }

    /// Sets the field filter.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// The search expression, or [`WILDCARD`] when absent or empty.
    #[must_use]
    pub fn search_string(&self) -> &str {
        self.query_string
            .as_deref()
            .filter(|q| !q.is_empty())
            .unwrap_or(WILDCARD)
    }

    /// The first page size, if any. A zero limit counts as unset.
    #[must_use]
    pub fn first_limit(&self) -> Option<u64> {
        self.limit
            .as_ref()
            .and_then(|l| l.first().copied())
            .filter(|&limit| limit > 0)
    }

    /// The first sort clause, if any. An empty clause counts as unset.
    #[must_use]
    pub fn first_sort(&self) -> Option<&str> {
        self.sort
            .as_ref()
            .and_then(|s| s.first())
            .map(String::as_str)
            .filter(|sort| !sort.is_empty())
    }

    /// The field filter as a slice, if any.
    #[must_use]
    pub fn field_filter(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }
}

/// Parses free-text query strings into descriptors.
#[cfg_attr(test, mockall::automock)]
pub trait QueryInterpreter: Send + Sync {
    /// Parses `input` into a descriptor.
    fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError>;
}

impl<F> QueryInterpreter for F
where
    F: Fn(&str) -> Result<QueryDescriptor, ParseError> + Send + Sync,
{
    fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError> {
        self(input)
    }
}

/// Uses the whole trimmed input as the search expression.
///
/// Blank input yields no expression, which resolves to [`WILDCARD`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughInterpreter;

impl QueryInterpreter for PassthroughInterpreter {
    fn parse(&self, input: &str) -> Result<QueryDescriptor, ParseError> {
        let trimmed = input.trim();
        let mut descriptor = QueryDescriptor::new();
        if !trimmed.is_empty() {
            descriptor.query_string = Some(trimmed.to_string());
        }
        Ok(descriptor)
    }
}
