//! HTTP transport for backend requests.
//!
//! The client talks to the backend only through [`Transport`], so the
//! request path can be exercised without a network.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::errors::SearchError;

/// Issues GET requests and decodes JSON bodies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET to `url` with `params` as the query string.
    ///
    /// A non-2xx status is reported as [`SearchError::Upstream`]; a failure
    /// to connect or to decode the body as [`SearchError::Transport`].
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Value, SearchError>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Configuration`] if a configured header is not
    /// a valid HTTP header, and [`SearchError::Transport`] if the HTTP
    /// client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, SearchError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SearchError::configuration(format!("invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SearchError::configuration(format!("invalid value for header '{key}': {e}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| SearchError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }

    /// Wraps an existing HTTP client.
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Value, SearchError> {
        let mut request = self.http.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await;
            return Err(SearchError::upstream(
                Some(status.as_u16()),
                error_value_from_read(body),
            ));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Error value for a failed response, keeping the read error when the body
/// could not be read.
fn error_value_from_read<E: std::fmt::Display>(body: Result<String, E>) -> Value {
    match body {
        Ok(text) => error_value_from_body(&text),
        Err(err) => Value::String(format!("failed to read response body: {err}")),
    }
}

/// Picks the most useful error value out of a failed response body.
fn error_value_from_body(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(mut body)) => match body.remove("error") {
            Some(error) if is_truthy(&error) => error,
            _ => Value::Object(body),
        },
        Ok(other) => other,
        Err(_) => Value::String(text.to_string()),
    }
}

/// JavaScript-style truthiness, as backends that report `error: false` or
/// `error: null` on success expect.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
