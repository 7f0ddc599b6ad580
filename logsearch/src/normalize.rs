//! Normalization of raw search hits into caller-facing records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized result record, in field insertion order.
pub type Record = Map<String, Value>;

/// One raw result document as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Index the document came from.
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Value>,
    /// Document id.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Relevance score, absent when sorting by a field.
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Value>,
    /// The document content.
    #[serde(rename = "_source", default)]
    pub source: Option<Record>,
}

impl Hit {
    /// Creates a hit wrapping `source`.
    #[must_use]
    pub fn new(source: Record) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }
}

/// Body of a `_search` response; only the hit list is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The outer `hits` object.
    pub hits: HitList,
}

/// The `hits` object of a search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitList {
    /// Matching documents, in backend order.
    #[serde(default)]
    pub hits: Vec<Hit>,
}

impl SearchResponse {
    /// Consumes the response, yielding its hits in backend order.
    #[must_use]
    pub fn into_hits(self) -> Vec<Hit> {
        self.hits.hits
    }
}

/// What to do with a requested field the document does not have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Keep the key with a `null` value.
    #[default]
    Null,
    /// Leave the key out of the record.
    Omit,
}

/// Maps a hit into a record, keeping only `fields` when given.
///
/// Without a field filter the document content is returned as is. With
/// one, the record holds the requested fields in the filter's order; fields
/// the document lacks are handled per `policy`.
#[must_use]
pub fn normalize(hit: Hit, fields: Option<&[String]>, policy: MissingFieldPolicy) -> Record {
    let source = hit.source.unwrap_or_default();
    match fields {
        None => source,
        Some(fields) => only(&source, fields, policy),
    }
}

/// Builds a new record holding only `fields` from `source`.
#[must_use]
pub fn only(source: &Record, fields: &[String], policy: MissingFieldPolicy) -> Record {
    let mut record = Record::new();
    for field in fields {
        match (source.get(field), policy) {
            (Some(value), _) => {
                record.insert(field.clone(), value.clone());
            }
            (None, MissingFieldPolicy::Null) => {
                record.insert(field.clone(), Value::Null);
            }
            (None, MissingFieldPolicy::Omit) => {}
        }
    }
    record
}
