//! Configuration for the search client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::SearchError;
use crate::normalize::MissingFieldPolicy;

/// Environment variable read by [`ClientConfig::from_env`].
pub const URL_ENV_VAR: &str = "LOGSEARCH_URL";

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the search backend.
    #[serde(default)]
    pub url: Option<String>,
    /// Page size used when neither the query nor the caller sets one.
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// Sort clause used when the query sets none.
    #[serde(default = "default_sort")]
    pub default_sort: String,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Handling of requested fields a document lacks.
    #[serde(default)]
    pub missing_fields: MissingFieldPolicy,
}

fn default_limit() -> u64 {
    10
}

fn default_sort() -> String {
    "timestamp:desc".to_string()
}

fn default_user_agent() -> String {
    concat!("logsearch/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: None,
            default_limit: default_limit(),
            default_sort: default_sort(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
            missing_fields: MissingFieldPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration pointing at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Creates a configuration from the `LOGSEARCH_URL` environment variable.
    ///
    /// The URL stays unset when the variable is missing, so building a
    /// client from it fails with a configuration error.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: std::env::var(URL_ENV_VAR).ok(),
            ..Self::default()
        }
    }

    /// Sets the default page size.
    #[must_use]
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Sets the default sort clause.
    #[must_use]
    pub fn with_default_sort(mut self, sort: impl Into<String>) -> Self {
        self.default_sort = sort.into();
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the missing-field policy.
    #[must_use]
    pub fn with_missing_fields(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_fields = policy;
        self
    }

    /// Checks the configuration and returns the base URL without a
    /// trailing slash.
    pub fn validate(&self) -> Result<String, SearchError> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SearchError::configuration("search backend url required"))?;

        if self.default_limit == 0 {
            return Err(SearchError::configuration("default_limit must be > 0"));
        }
        if self.default_sort.trim().is_empty() {
            return Err(SearchError::configuration("default_sort must not be empty"));
        }

        Ok(url.trim_end_matches('/').to_string())
    }
}

/// Per-call options for [`Client::query`](crate::Client::query).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Page size, used only when the parsed query sets none.
    #[serde(default)]
    pub limit: Option<u64>,
}

impl QueryOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
