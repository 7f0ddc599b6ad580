//! The per-call event stream returned by [`Client::query`](crate::Client::query).

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::errors::SearchError;
use crate::normalize::Record;

/// One event delivered by a [`QueryHandle`].
///
/// A handle yields zero or more `Data` events followed by `End` on success,
/// or a single `Error` and nothing else on failure.
#[derive(Debug)]
pub enum QueryEvent {
    /// One normalized record.
    Data(Record),
    /// The request failed; no records were or will be delivered.
    Error(SearchError),
    /// All records have been delivered.
    End,
}

impl QueryEvent {
    /// Whether this event ends the sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::End)
    }
}

/// Receives the events of one `query` invocation.
///
/// Events are buffered from the moment the handle is created, so a caller
/// that starts polling late still observes every event. Dropping the handle
/// does not abort the in-flight request.
#[derive(Debug)]
pub struct QueryHandle {
    request_id: String,
    events: mpsc::UnboundedReceiver<QueryEvent>,
    finished: bool,
}

impl QueryHandle {
    pub(crate) fn new(request_id: String, events: mpsc::UnboundedReceiver<QueryEvent>) -> Self {
        Self {
            request_id,
            events,
            finished: false,
        }
    }

    /// Identifier shared with the events this request sent to the sink.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Waits for the next event; `None` once a terminal event was seen.
    pub async fn next_event(&mut self) -> Option<QueryEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        self.observe(event.as_ref());
        event
    }

    /// Drains the handle into the full record list, or the first error.
    pub async fn collect_records(mut self) -> Result<Vec<Record>, SearchError> {
        let mut records = Vec::new();
        while let Some(event) = self.next_event().await {
            match event {
                QueryEvent::Data(record) => records.push(record),
                QueryEvent::End => return Ok(records),
                QueryEvent::Error(err) => return Err(err),
            }
        }
        Err(SearchError::transport(
            "query task stopped before delivering a terminal event",
        ))
    }

    fn observe(&mut self, event: Option<&QueryEvent>) {
        if event.map_or(true, QueryEvent::is_terminal) {
            self.finished = true;
            self.events.close();
        }
    }
}

impl Stream for QueryHandle {
    type Item = QueryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let polled = self.events.poll_recv(cx);
        if let Poll::Ready(ref event) = polled {
            self.observe(event.as_ref());
        }
        polled
    }
}
