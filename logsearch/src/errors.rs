//! Error types for the logsearch client.
//!
//! Every failure is reported to the nearest caller boundary: the `Result`
//! of `stats`/`count`, the synchronous `Result` of `query`, or the single
//! `QueryEvent::Error` of a query handle.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for logsearch operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The client configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend could not be reached, or its body could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered but reported an error.
    #[error("{}", format_upstream(.status, .error))]
    Upstream {
        /// HTTP status, when the error came from a non-2xx response.
        status: Option<u16>,
        /// The error value reported by the backend.
        error: Value,
    },

    /// The query interpreter rejected the input.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

fn format_upstream(status: &Option<u16>, error: &Value) -> String {
    let detail = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match status {
        Some(code) => format!("Upstream error (HTTP {code}): {detail}"),
        None => format!("Upstream error: {detail}"),
    }
}

impl SearchError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an upstream error from a value the backend reported.
    #[must_use]
    pub fn upstream(status: Option<u16>, error: impl Into<Value>) -> Self {
        Self::Upstream {
            status,
            error: error.into(),
        }
    }

    /// Stable tag naming the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Transport(_) => "TransportError",
            Self::Upstream { .. } => "UpstreamError",
            Self::Parse(_) => "ParseError",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::Upstream { status, error } => {
                if let Some(code) = status {
                    map.insert("status".to_string(), serde_json::json!(code));
                }
                map.insert("error".to_string(), error.clone());
            }
            Self::Parse(err) => {
                map.insert("input".to_string(), serde_json::json!(err.input));
            }
            Self::Configuration(_) | Self::Transport(_) => {}
        }

        map
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Error raised by a query interpreter that cannot parse its input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to parse query '{input}': {message}")]
pub struct ParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub message: String,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for logsearch results.
pub type Result<T> = std::result::Result<T, SearchError>;
