//! Structured request events and the sinks that receive them.
//!
//! Every backend request emits `request.started` followed by exactly one of
//! `request.completed` or `request.failed`, all tagged with the same
//! `request_id`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Emitted before a request is sent.
pub const REQUEST_STARTED: &str = "request.started";
/// Emitted after a request succeeds.
pub const REQUEST_COMPLETED: &str = "request.completed";
/// Emitted after a request fails.
pub const REQUEST_FAILED: &str = "request.failed";

/// An event as recorded by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEvent {
    /// The event type (e.g., "request.started").
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl SearchEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            data,
        }
    }

    /// The `request_id` carried in the payload, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.data.as_ref()?.get("request_id")?.as_str()
    }
}

pub(crate) fn started_data(
    request_id: &str,
    operation: &str,
    url: &str,
    params: &[(String, String)],
) -> serde_json::Value {
    let params: serde_json::Map<String, serde_json::Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    json!({
        "request_id": request_id,
        "operation": operation,
        "url": url,
        "params": params,
    })
}

pub(crate) fn completed_data(
    request_id: &str,
    operation: &str,
    duration_ms: f64,
    hits: Option<usize>,
) -> serde_json::Value {
    let mut data = json!({
        "request_id": request_id,
        "operation": operation,
        "duration_ms": duration_ms,
    });
    if let (Some(hits), Some(map)) = (hits, data.as_object_mut()) {
        map.insert("hits".to_string(), json!(hits));
    }
    data
}

pub(crate) fn failed_data(
    request_id: &str,
    operation: &str,
    duration_ms: f64,
    error: &crate::errors::SearchError,
) -> serde_json::Value {
    json!({
        "request_id": request_id,
        "operation": operation,
        "duration_ms": duration_ms,
        "error_type": error.kind(),
        "error": error.to_string(),
    })
}
