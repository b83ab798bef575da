use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::domain::endpoint::HistoryEndpoint;
use crate::domain::history::HistoryContext;
use crate::domain::llm::{LlmStream, StreamChunk};
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Accumulating,
    Finalizing,
    Done,
    Failed,
}

/// Result of a completed session
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    /// Full response text
    pub text: String,
    /// History as written
    pub history: HistoryContext,
}

/// Collects a completion's fragments and writes history once it finishes
///
/// The write stores `query + response + prior history` and happens at most
/// once per aggregator. Nothing is written if the stream fails or is
/// dropped before its finish indicator.
#[derive(Debug)]
pub struct StreamAggregator {
    history: HistoryEndpoint,
    context_id: String,
    query: String,
    prior_history: String,
    buffer: String,
    state: AggregatorState,
}

impl StreamAggregator {
    pub fn new(
        history: HistoryEndpoint,
        context_id: impl Into<String>,
        query: impl Into<String>,
        prior_history: impl Into<String>,
    ) -> Self {
        Self {
            history,
            context_id: context_id.into(),
            query: query.into(),
            prior_history: prior_history.into(),
            buffer: String::new(),
            state: AggregatorState::Accumulating,
        }
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Feed one fragment; yields the finalized session on the terminal one
    pub async fn accept(&mut self, chunk: &StreamChunk) -> Result<Option<Finalized>, DomainError> {
        if self.state != AggregatorState::Accumulating {
            debug!(
                context_id = %self.context_id,
                state = ?self.state,
                terminal = chunk.is_terminal(),
                "Ignoring fragment after the session ended"
            );
            return Ok(None);
        }

        self.buffer.push_str(chunk.delta_text());
        if !chunk.is_terminal() {
            return Ok(None);
        }

        self.state = AggregatorState::Finalizing;
        let entry = format!("{}{}{}", self.query, self.buffer, self.prior_history);

        match self.history.put(&self.context_id, &entry).await {
            Ok(history) => {
                self.state = AggregatorState::Done;
                debug!(context_id = %self.context_id, len = self.buffer.len(), "Session finalized");
                Ok(Some(Finalized {
                    text: std::mem::take(&mut self.buffer),
                    history,
                }))
            }
            Err(e) => {
                self.state = AggregatorState::Failed;
                warn!(context_id = %self.context_id, error = %e, "Failed to write history");
                Err(e)
            }
        }
    }

    /// Abort after a transport error; the partial response is discarded
    pub fn fail(&mut self, error: &DomainError) {
        if self.state == AggregatorState::Accumulating {
            warn!(
                context_id = %self.context_id,
                discarded = self.buffer.len(),
                error = %error,
                "Stream failed before completion"
            );
            self.buffer.clear();
            self.state = AggregatorState::Failed;
        }
    }

    /// Consume `stream` until its terminal fragment, passing each fragment to `observer`
    pub async fn drive<F>(mut self, mut stream: LlmStream, mut observer: F) -> Result<Finalized, DomainError>
    where
        F: FnMut(&StreamChunk),
    {
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    observer(&chunk);
                    if let Some(finalized) = self.accept(&chunk).await? {
                        return Ok(finalized);
                    }
                }
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            }
        }

        let error = DomainError::stream_transport("Stream ended without a finish indicator");
        self.fail(&error);
        Err(error)
    }

    /// Pass `stream` through unchanged, finalizing when the terminal fragment goes by
    ///
    /// A failed history write is delivered as an extra `Err` item after the
    /// terminal fragment.
    pub fn tap(self, stream: LlmStream) -> LlmStream {
        struct Tap {
            aggregator: StreamAggregator,
            stream: LlmStream,
            pending: Option<DomainError>,
            finished: bool,
        }

        let tap = Tap {
            aggregator: self,
            stream,
            pending: None,
            finished: false,
        };

        Box::pin(stream::unfold(tap, |mut tap| async move {
            if let Some(error) = tap.pending.take() {
                tap.finished = true;
                return Some((Err(error), tap));
            }
            if tap.finished {
                return None;
            }

            match tap.stream.next().await {
                Some(Ok(chunk)) => {
                    if let Err(e) = tap.aggregator.accept(&chunk).await {
                        tap.pending = Some(e);
                    }
                    Some((Ok(chunk), tap))
                }
                Some(Err(e)) => {
                    tap.aggregator.fail(&e);
                    tap.finished = true;
                    Some((Err(e), tap))
                }
                None => {
                    if tap.aggregator.state() == AggregatorState::Accumulating {
                        tap.aggregator
                            .fail(&DomainError::stream_transport("Stream ended without a finish indicator"));
                    }
                    None
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures::stream;
    use mockall::predicate::eq;

    use crate::domain::endpoint::Endpoint;
    use crate::domain::history::MockHistoryStore;
    use crate::domain::llm::FinishReason;
    use crate::domain::retry::RetryPolicy;

    fn history(store: MockHistoryStore) -> HistoryEndpoint {
        HistoryEndpoint::new(Endpoint::new("history", RetryPolicy::no_retry()), Arc::new(store))
    }

    fn expecting_put(entry: &'static str, times: usize) -> MockHistoryStore {
        let mut store = MockHistoryStore::new();
        store
            .expect_put()
            .with(eq("ctx"), eq(entry))
            .times(times)
            .returning(|id, response| Ok(HistoryContext::new(id, response)));
        store.expect_store_type().return_const("mock");
        store
    }

    fn delta(text: &str) -> StreamChunk {
        StreamChunk::new("id", "model").with_delta(text)
    }

    fn terminal(text: &str) -> StreamChunk {
        delta(text).with_finish_reason(FinishReason::Stop)
    }

    fn aggregator(store: MockHistoryStore) -> StreamAggregator {
        StreamAggregator::new(history(store), "ctx", "Q:", "|old")
    }

    #[tokio::test]
    async fn test_duplicate_terminal_writes_once() {
        let mut aggregator = aggregator(expecting_put("Q:hello|old", 1));

        assert!(aggregator.accept(&delta("hel")).await.unwrap().is_none());
        let finalized = aggregator.accept(&terminal("lo")).await.unwrap().unwrap();
        assert_eq!(finalized.text, "hello");
        assert_eq!(aggregator.state(), AggregatorState::Done);

        assert!(aggregator.accept(&terminal("")).await.unwrap().is_none());
        assert!(aggregator.accept(&delta("late")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abandoned_session_writes_nothing() {
        let mut store = MockHistoryStore::new();
        store.expect_put().times(0);

        let mut aggregator = aggregator(store);
        aggregator.accept(&delta("partial")).await.unwrap();
        drop(aggregator);
    }

    #[tokio::test]
    async fn test_non_streaming_stop_response() {
        let aggregator = aggregator(expecting_put("Q:answer|old", 1));
        let single: LlmStream = Box::pin(stream::iter(vec![Ok(terminal("answer"))]));

        let finalized = aggregator.drive(single, |_| {}).await.unwrap();

        assert_eq!(finalized.text, "answer");
        assert_eq!(finalized.history.response, "Q:answer|old");
    }

    #[tokio::test]
    async fn test_transport_error_discards_partial_text() {
        let mut store = MockHistoryStore::new();
        store.expect_put().times(0);

        let aggregator = aggregator(store);
        let faulty: LlmStream = Box::pin(stream::iter(vec![
            Ok(delta("par")),
            Err(DomainError::stream_transport("reset")),
            Ok(terminal("tial")),
        ]));

        let result = aggregator.drive(faulty, |_| {}).await;
        assert!(matches!(result, Err(DomainError::StreamTransport { .. })));
    }

    #[tokio::test]
    async fn test_stream_without_terminal_writes_nothing() {
        let mut store = MockHistoryStore::new();
        store.expect_put().times(0);

        let aggregator = aggregator(store);
        let unfinished: LlmStream = Box::pin(stream::iter(vec![Ok(delta("a")), Ok(delta("b"))]));

        assert!(aggregator.drive(unfinished, |_| {}).await.is_err());
    }

    #[tokio::test]
    async fn test_history_write_failure_fails_session() {
        let mut store = MockHistoryStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(DomainError::storage("redis down")));
        store.expect_store_type().return_const("mock");

        let mut aggregator = aggregator(store);
        let result = aggregator.accept(&terminal("x")).await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
        assert_eq!(aggregator.state(), AggregatorState::Failed);
        assert!(aggregator.accept(&terminal("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drive_forwards_every_fragment() {
        let aggregator = aggregator(expecting_put("Q:abc|old", 1));
        let chunks: LlmStream = Box::pin(stream::iter(vec![
            Ok(delta("a")),
            Ok(delta("b")),
            Ok(terminal("c")),
        ]));

        let mut seen = Vec::new();
        let finalized = aggregator
            .drive(chunks, |chunk| seen.push(chunk.delta_text().to_string()))
            .await
            .unwrap();

        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(finalized.text, "abc");
    }

    #[tokio::test]
    async fn test_tap_passes_through_and_writes_once() {
        let aggregator = aggregator(expecting_put("Q:hi|old", 1));
        let chunks: LlmStream = Box::pin(stream::iter(vec![
            Ok(delta("h")),
            Ok(terminal("i")),
            Ok(terminal("")),
        ]));

        let items: Vec<_> = aggregator.tap(chunks).collect().await;

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.is_ok()));
    }

    #[tokio::test]
    async fn test_tap_reports_write_failure() {
        let mut store = MockHistoryStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(DomainError::storage("redis down")));
        store.expect_store_type().return_const("mock");

        let chunks: LlmStream = Box::pin(stream::iter(vec![Ok(terminal("x"))]));
        let items: Vec<_> = aggregator(store).tap(chunks).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(DomainError::Storage { .. })));
    }
}
