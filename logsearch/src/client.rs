//! The search client: `stats`, `count` and `query` over the backend API.

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{ClientConfig, QueryOptions};
use crate::errors::{Result, SearchError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::handle::{QueryEvent, QueryHandle};
use crate::interpreter::{PassthroughInterpreter, QueryDescriptor, QueryInterpreter};
use crate::normalize::{normalize, Record, SearchResponse};
use crate::transport::{is_truthy, ReqwestTransport, Transport};

/// Query parameters of a `_search` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// The search expression (`q`).
    pub q: String,
    /// Page size (`size`).
    pub size: u64,
    /// Sort clause (`sort`).
    pub sort: String,
}

impl SearchParams {
    /// Resolves parameters from a descriptor, caller options and the
    /// configured defaults.
    ///
    /// Page size comes from the descriptor's first limit, then
    /// `options.limit`, then `config.default_limit`. Sort comes from the
    /// descriptor's first sort clause, then `config.default_sort`.
    #[must_use]
    pub fn resolve(descriptor: &QueryDescriptor, options: QueryOptions, config: &ClientConfig) -> Self {
        Self {
            q: descriptor.search_string().to_string(),
            size: descriptor
                .first_limit()
                .or(options.limit.filter(|&limit| limit > 0))
                .unwrap_or(config.default_limit),
            sort: descriptor
                .first_sort()
                .unwrap_or(config.default_sort.as_str())
                .to_string(),
        }
    }

    /// The parameters as query-string pairs.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("q".to_string(), self.q.clone()),
            ("size".to_string(), self.size.to_string()),
            ("sort".to_string(), self.sort.clone()),
        ]
    }
}

/// Query parameters of a `_count` request.
#[must_use]
pub fn count_params(descriptor: &QueryDescriptor) -> Vec<(String, String)> {
    vec![("q".to_string(), descriptor.search_string().to_string())]
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    interpreter: Option<Arc<dyn QueryInterpreter>>,
    transport: Option<Arc<dyn Transport>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("has_interpreter", &self.interpreter.is_some())
            .field("has_transport", &self.transport.is_some())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl ClientBuilder {
    /// Sets the query interpreter. Defaults to [`PassthroughInterpreter`].
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl QueryInterpreter + 'static) -> Self {
        self.interpreter = Some(Arc::new(interpreter));
        self
    }

    /// Sets the transport. Defaults to [`ReqwestTransport`].
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the event sink. Defaults to [`NoOpEventSink`].
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validates the configuration and builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Configuration`] when the URL is missing or
    /// empty, or another setting is invalid.
    pub fn build(self) -> Result<Client> {
        let base_url = self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        Ok(Client {
            inner: Arc::new(Inner {
                base_url,
                config: self.config,
                interpreter: self
                    .interpreter
                    .unwrap_or_else(|| Arc::new(PassthroughInterpreter)),
                transport,
                sink: self.sink.unwrap_or_else(|| Arc::new(NoOpEventSink)),
            }),
        })
    }
}

/// Client for a search backend's HTTP query API.
///
/// Cloning is cheap; clones share the transport, interpreter and sink.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    config: ClientConfig,
    interpreter: Arc<dyn QueryInterpreter>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("default_limit", &self.inner.config.default_limit)
            .field("default_sort", &self.inner.config.default_sort)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client with the default interpreter, transport and sink.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Configuration`] when the URL is missing or
    /// empty.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Starts building a client.
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            interpreter: None,
            transport: None,
            sink: None,
        }
    }

    /// The base URL requests are sent to, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Fetches backend statistics from `_stats`.
    pub async fn stats(&self) -> Result<Value> {
        let url = self.inner.endpoint("_stats");
        self.inner
            .run(&new_request_id(), "stats", &url, Vec::new(), |body| Ok((body, None)))
            .await
    }

    /// Counts documents matching `query` via `_count`.
    ///
    /// The query is parsed before any request is made; a parse failure is
    /// returned as [`SearchError::Parse`].
    pub async fn count(&self, query: &str) -> Result<Value> {
        let descriptor = self.inner.interpreter.parse(query)?;
        let url = self.inner.endpoint("_count");
        self.inner
            .run(&new_request_id(), "count", &url, count_params(&descriptor), |body| {
                Ok((body, None))
            })
            .await
    }

    /// Like [`count`](Self::count), returning only the `count` field.
    pub async fn count_value(&self, query: &str) -> Result<u64> {
        let body = self.count(query).await?;
        body.get("count").and_then(Value::as_u64).ok_or_else(|| {
            SearchError::upstream(None, json!(format!("count response has no integer count: {body}")))
        })
    }

    /// Searches with `query` and returns a handle delivering each record.
    ///
    /// Parsing happens synchronously and a parse failure is returned
    /// immediately, before any request. The request itself runs on a
    /// spawned task, so this must be called within a Tokio runtime.
    pub fn query(&self, query: &str, options: QueryOptions) -> Result<QueryHandle> {
        let descriptor = self.inner.interpreter.parse(query)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SearchError::configuration(format!("query requires a Tokio runtime: {e}")))?;

        let params = SearchParams::resolve(&descriptor, options, &self.inner.config);
        let fields = descriptor.fields;
        let request_id = new_request_id();
        let (tx, rx) = mpsc::unbounded_channel();

        let inner = Arc::clone(&self.inner);
        let task_request_id = request_id.clone();
        runtime.spawn(async move {
            match inner.search(&task_request_id, &params, fields.as_deref()).await {
                Ok(records) => {
                    for record in records {
                        if tx.send(QueryEvent::Data(record)).is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(QueryEvent::End);
                }
                Err(err) => {
                    let _ = tx.send(QueryEvent::Error(err));
                }
            }
        });

        Ok(QueryHandle::new(request_id, rx))
    }

    /// Runs [`query`](Self::query) and collects every record.
    pub async fn search(&self, query: &str, options: QueryOptions) -> Result<Vec<Record>> {
        self.query(query, options)?.collect_records().await
    }
}

impl Inner {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn search(
        &self,
        request_id: &str,
        params: &SearchParams,
        fields: Option<&[String]>,
    ) -> Result<Vec<Record>> {
        let url = self.endpoint("_search");
        let policy = self.config.missing_fields;
        self.run(request_id, "search", &url, params.to_query(), |body| {
            let response: SearchResponse = serde_json::from_value(body).map_err(|e| {
                SearchError::upstream(None, json!(format!("malformed search response: {e}")))
            })?;
            let records: Vec<Record> = response
                .into_hits()
                .into_iter()
                .map(|hit| normalize(hit, fields, policy))
                .collect();
            let count = records.len();
            Ok((records, Some(count)))
        })
        .await
    }

    /// Sends one request, checks it for a backend-reported error, decodes
    /// it, and reports the outcome to the sink.
    async fn run<T, F>(
        &self,
        request_id: &str,
        operation: &str,
        url: &str,
        params: Vec<(String, String)>,
        decode: F,
    ) -> Result<T>
    where
        F: FnOnce(Value) -> Result<(T, Option<usize>)>,
    {
        self.sink.emit(
            events::REQUEST_STARTED,
            Some(events::started_data(request_id, operation, url, &params)),
        );

        let started = Instant::now();
        let outcome = match self.transport.get(url, &params).await {
            Ok(body) => check_upstream(body).and_then(decode),
            Err(err) => Err(err),
        };
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok((value, hits)) => {
                self.sink.emit(
                    events::REQUEST_COMPLETED,
                    Some(events::completed_data(request_id, operation, duration_ms, hits)),
                );
                Ok(value)
            }
            Err(err) => {
                self.sink.emit(
                    events::REQUEST_FAILED,
                    Some(events::failed_data(request_id, operation, duration_ms, &err)),
                );
                Err(err)
            }
        }
    }
}

/// Rejects a successful response whose body reports an error.
fn check_upstream(body: Value) -> Result<Value> {
    match body.get("error") {
        Some(error) if is_truthy(error) => Err(SearchError::upstream(None, error.clone())),
        _ => Ok(body),
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseError;
    use crate::events::CollectingEventSink;
    use crate::interpreter::MockQueryInterpreter;
    use crate::transport::MockTransport;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    fn config() -> ClientConfig {
        ClientConfig::new("http://es.local:9200/")
    }

    fn client_with(transport: MockTransport, interpreter: MockQueryInterpreter) -> Client {
        Client::builder(config())
            .with_transport(Arc::new(transport))
            .with_interpreter(interpreter)
            .build()
            .unwrap()
    }

    fn interpreter_returning(descriptor: QueryDescriptor) -> MockQueryInterpreter {
        let mut interpreter = MockQueryInterpreter::new();
        interpreter
            .expect_parse()
            .returning(move |_| Ok(descriptor.clone()));
        interpreter
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_new_requires_url() {
        let err = Client::new(ClientConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");

        let err = Client::new(ClientConfig::new("")).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = Client::new(config()).unwrap();
        assert_eq!(client.base_url(), "http://es.local:9200");
    }

    #[test]
    fn test_search_params_defaults() {
        let params = SearchParams::resolve(&QueryDescriptor::new(), QueryOptions::new(), &config());
        assert_eq!(
            params,
            SearchParams {
                q: "*".to_string(),
                size: 10,
                sort: "timestamp:desc".to_string(),
            }
        );
    }

    #[test]
    fn test_search_params_precedence() {
        let options = QueryOptions::new().with_limit(25);

        let from_options = SearchParams::resolve(&QueryDescriptor::new(), options, &config());
        assert_eq!(from_options.size, 25);

        let descriptor = QueryDescriptor::new()
            .with_query_string("level:error")
            .with_limit(5)
            .with_sort("level:asc");
        let from_descriptor = SearchParams::resolve(&descriptor, options, &config());
        assert_eq!(from_descriptor.q, "level:error");
        assert_eq!(from_descriptor.size, 5);
        assert_eq!(from_descriptor.sort, "level:asc");
    }

    #[test]
    fn test_search_params_empty_values_fall_back() {
        let descriptor: QueryDescriptor =
            serde_json::from_value(json!({"string": "", "limit": [0], "sort": [""]})).unwrap();

        let resolved = SearchParams::resolve(&descriptor, QueryOptions::new().with_limit(25), &config());
        assert_eq!(
            resolved,
            SearchParams {
                q: "*".to_string(),
                size: 25,
                sort: "timestamp:desc".to_string(),
            }
        );

        let resolved = SearchParams::resolve(&descriptor, QueryOptions::new().with_limit(0), &config());
        assert_eq!(resolved.size, 10);
    }

    #[test]
    fn test_count_params_empty_string_is_wildcard() {
        let descriptor = QueryDescriptor::new().with_query_string("");
        assert_eq!(count_params(&descriptor), params(&[("q", "*")]));
    }

    #[test]
    fn test_search_params_to_query() {
        let resolved = SearchParams::resolve(&QueryDescriptor::new(), QueryOptions::new(), &config());
        assert_eq!(
            resolved.to_query(),
            params(&[("q", "*"), ("size", "10"), ("sort", "timestamp:desc")])
        );
    }

    #[test]
    fn test_check_upstream() {
        assert!(check_upstream(json!({"count": 1})).is_ok());
        assert!(check_upstream(json!({"error": null, "count": 1})).is_ok());
        assert!(check_upstream(json!({"error": false})).is_ok());

        let err = check_upstream(json!({"error": "index_not_found"})).unwrap_err();
        assert_eq!(err.kind(), "UpstreamError");
    }

    #[tokio::test]
    async fn test_stats_passes_body_through() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, params| url == "http://es.local:9200/_stats" && params.is_empty())
            .times(1)
            .returning(|_, _| Ok(json!({"_all": {"primaries": {}}})));

        let client = client_with(transport, MockQueryInterpreter::new());
        let body = client.stats().await.unwrap();
        assert_eq!(body, json!({"_all": {"primaries": {}}}));
    }

    #[tokio::test]
    async fn test_count_uses_resolved_query_string() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, params| {
                url == "http://es.local:9200/_count" && params == [("q".to_string(), "status:500".to_string())]
            })
            .times(1)
            .returning(|_, _| Ok(json!({"count": 42})));

        let client = client_with(
            transport,
            interpreter_returning(QueryDescriptor::new().with_query_string("status:500")),
        );
        assert_eq!(client.count("status:500").await.unwrap(), json!({"count": 42}));
    }

    #[tokio::test]
    async fn test_count_defaults_to_wildcard() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|_, params| params == [("q".to_string(), "*".to_string())])
            .returning(|_, _| Ok(json!({"count": 7})));

        let client = client_with(transport, interpreter_returning(QueryDescriptor::new()));
        assert_eq!(client.count_value("").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_count_value_requires_count_field() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Ok(json!({"shards": 1})));

        let client = client_with(transport, interpreter_returning(QueryDescriptor::new()));
        let err = client.count_value("x").await.unwrap_err();
        assert_eq!(err.kind(), "UpstreamError");
    }

    #[tokio::test]
    async fn test_count_parse_error_skips_request() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(0);

        let mut interpreter = MockQueryInterpreter::new();
        interpreter
            .expect_parse()
            .returning(|input| Err(ParseError::new(input, "unexpected end of input")));

        let client = client_with(transport, interpreter);
        let err = client.count("level:(").await.unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[tokio::test]
    async fn test_stats_body_error_is_upstream() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Ok(json!({"error": "cluster_block_exception", "status": 403})));

        let client = client_with(transport, MockQueryInterpreter::new());
        match client.stats().await.unwrap_err() {
            SearchError::Upstream { status, error } => {
                assert_eq!(status, None);
                assert_eq!(error, json!("cluster_block_exception"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_query_emits_filtered_records_then_end() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, query| {
                url == "http://es.local:9200/_search"
                    && query == params(&[("q", "error"), ("size", "10"), ("sort", "timestamp:desc")])
            })
            .times(1)
            .returning(|_, _| {
                Ok(json!({"hits": {"hits": [
                    {"_source": {"message": "boom", "level": "error", "timestamp": 100}}
                ]}}))
            });

        let client = client_with(
            transport,
            interpreter_returning(
                QueryDescriptor::new()
                    .with_query_string("error")
                    .with_fields(["message"]),
            ),
        );

        let mut handle = client.query("error", QueryOptions::new()).unwrap();
        match handle.next().await {
            Some(QueryEvent::Data(record)) => {
                assert_eq!(Value::Object(record), json!({"message": "boom"}));
            }
            other => panic!("expected data, got {other:?}"),
        }
        assert!(matches!(handle.next().await, Some(QueryEvent::End)));
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn test_query_error_has_no_end() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Ok(json!({"error": {"type": "search_phase_execution_exception"}})));

        let client = client_with(transport, interpreter_returning(QueryDescriptor::new()));
        let handle = client.query("x", QueryOptions::new()).unwrap();
        let events: Vec<QueryEvent> = handle.collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], QueryEvent::Error(SearchError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_query_malformed_body_is_upstream() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Ok(json!({"took": 1})));

        let client = client_with(transport, interpreter_returning(QueryDescriptor::new()));
        let err = client.search("x", QueryOptions::new()).await.unwrap_err();
        assert_eq!(err.kind(), "UpstreamError");
        assert!(err.to_string().contains("malformed search response"));
    }

    #[tokio::test]
    async fn test_query_parse_error_is_synchronous() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(0);

        let mut interpreter = MockQueryInterpreter::new();
        interpreter
            .expect_parse()
            .returning(|input| Err(ParseError::new(input, "bad token")));

        let client = client_with(transport, interpreter);
        let err = client.query("|||", QueryOptions::new()).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_query_outside_runtime_is_configuration_error() {
        let client = client_with(MockTransport::new(), interpreter_returning(QueryDescriptor::new()));
        let err = client.query("x", QueryOptions::new()).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[tokio::test]
    async fn test_sink_receives_request_lifecycle() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_get().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(json!({"count": 1}))
            } else {
                Err(SearchError::transport("connection refused"))
            }
        });

        let sink = Arc::new(CollectingEventSink::new());
        let client = Client::builder(config())
            .with_transport(Arc::new(transport))
            .with_interpreter(PassthroughInterpreter)
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        client.count("a").await.unwrap();
        client.count("b").await.unwrap_err();

        assert_eq!(
            sink.event_types(),
            vec![
                events::REQUEST_STARTED,
                events::REQUEST_COMPLETED,
                events::REQUEST_STARTED,
                events::REQUEST_FAILED,
            ]
        );
        let recorded = sink.events();
        assert_eq!(recorded[0].request_id(), recorded[1].request_id());
        assert_ne!(recorded[0].request_id(), recorded[2].request_id());
    }

    #[tokio::test]
    async fn test_query_handle_shares_request_id_with_sink() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Ok(json!({"hits": {"hits": [{"_source": {"n": 1}}]}})));

        let sink = Arc::new(CollectingEventSink::new());
        let client = Client::builder(config())
            .with_transport(Arc::new(transport))
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        let handle = client.query("n:1", QueryOptions::new()).unwrap();
        let request_id = handle.request_id().to_string();
        assert_eq!(handle.collect_records().await.unwrap().len(), 1);

        let completed = sink.events_of_type(events::REQUEST_COMPLETED);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].request_id(), Some(request_id.as_str()));
        assert_eq!(completed[0].data.as_ref().unwrap()["hits"], 1);
    }
}
