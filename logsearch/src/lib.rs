//! # Logsearch
//!
//! A thin client for a search engine's HTTP query API.
//!
//! Logsearch provides:
//!
//! - **Query translation**: a pluggable interpreter turns free text into a
//!   descriptor, which the client resolves into `q`, `size` and `sort`
//!   parameters with fixed defaults
//! - **Result normalization**: hits are unwrapped from their envelope and
//!   optionally filtered down to a requested field list
//! - **Two delivery shapes**: `stats`/`count` resolve to a single value,
//!   `query` returns a stream of per-record events
//! - **Injected observability**: request lifecycle events go to an
//!   [`EventSink`](events::EventSink) that defaults to a no-op
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use logsearch::prelude::*;
//!
//! let client = Client::new(ClientConfig::new("http://localhost:9200/logs"))?;
//!
//! let count = client.count_value("level:error").await?;
//!
//! let mut handle = client.query("level:error", QueryOptions::new().with_limit(5))?;
//! while let Some(event) = handle.next().await {
//!     match event {
//!         QueryEvent::Data(record) => println!("{}", serde_json::Value::Object(record)),
//!         QueryEvent::Error(err) => eprintln!("{err}"),
//!         QueryEvent::End => break,
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod handle;
pub mod interpreter;
pub mod normalize;
pub mod transport;

pub use client::{Client, ClientBuilder, SearchParams};
pub use config::{ClientConfig, QueryOptions};
pub use errors::{ParseError, SearchError};
pub use handle::{QueryEvent, QueryHandle};
pub use interpreter::{PassthroughInterpreter, QueryDescriptor, QueryInterpreter};
pub use normalize::{normalize, Hit, MissingFieldPolicy, Record};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{Client, ClientBuilder};
    pub use crate::config::{ClientConfig, QueryOptions};
    pub use crate::errors::{ParseError, SearchError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::handle::{QueryEvent, QueryHandle};
    pub use crate::interpreter::{PassthroughInterpreter, QueryDescriptor, QueryInterpreter};
    pub use crate::normalize::{MissingFieldPolicy, Record};
    pub use crate::transport::{ReqwestTransport, Transport};
}
