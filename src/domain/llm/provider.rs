use async_trait::async_trait;
use std::fmt::Debug;
use std::pin::Pin;
use futures::Stream;

use super::{LlmRequest, LlmResponse};
use super::response::StreamChunk;
use crate::domain::DomainError;

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DomainError>> + Send>>;

/// Trait for chat completion providers
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Open a streaming chat completion
    ///
    /// Errors returned here concern establishing the stream; faults after
    /// that arrive as `Err` items inside the stream.
    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::domain::llm::{FinishReason, Message};

    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        response: Option<LlmResponse>,
        chunks: Option<Vec<Result<StreamChunk, String>>>,
        error: Option<String>,
        transient_failures: AtomicU32,
        calls: AtomicU32,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                response: None,
                chunks: None,
                error: None,
                transient_failures: AtomicU32::new(0),
                calls: AtomicU32::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(mut self, response: LlmResponse) -> Self {
            self.response = Some(response);
            self
        }

        /// Reply with `content` and a `stop` finish reason
        pub fn with_content(self, content: impl Into<String>) -> Self {
            self.with_response(
                LlmResponse::new("mock-id", "mock-model", Message::assistant(content))
                    .with_finish_reason(FinishReason::Stop),
            )
        }

        /// Stream exactly these items; `Err` items become transport faults
        pub fn with_chunks(mut self, chunks: Vec<Result<StreamChunk, String>>) -> Self {
            self.chunks = Some(chunks);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Fail the next `count` calls with a transient error
        pub fn with_transient_failures(self, count: u32) -> Self {
            self.transient_failures.store(count, Ordering::SeqCst);
            self
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn record(&self, request: &LlmRequest) -> Result<(), DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            if let Some(ref error) = self.error {
                return Err(DomainError::fatal(self.name, error));
            }

            let left = self.transient_failures.load(Ordering::SeqCst);
            if left > 0 {
                self.transient_failures.store(left - 1, Ordering::SeqCst);
                return Err(DomainError::transient(self.name, "HTTP 503"));
            }

            Ok(())
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn chat(&self, _model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
            self.record(&request)?;

            self.response
                .clone()
                .ok_or_else(|| DomainError::fatal(self.name, "No mock response configured"))
        }

        async fn chat_stream(
            &self,
            _model: &str,
            request: LlmRequest,
        ) -> Result<LlmStream, DomainError> {
            self.record(&request)?;

            if let Some(ref chunks) = self.chunks {
                let items: Vec<Result<StreamChunk, DomainError>> = chunks
                    .iter()
                    .cloned()
                    .map(|item| item.map_err(DomainError::stream_transport))
                    .collect();

                return Ok(Box::pin(stream::iter(items)));
            }

            let response = self
                .response
                .clone()
                .ok_or_else(|| DomainError::fatal(self.name, "No mock response configured"))?;

            let chunks: Vec<Result<StreamChunk, DomainError>> = response
                .content()
                .chars()
                .map(|c| {
                    Ok(StreamChunk::new(response.id.clone(), response.model.clone())
                        .with_delta(c.to_string()))
                })
                .chain(std::iter::once(Ok(
                    StreamChunk::new(response.id.clone(), response.model.clone())
                        .with_finish_reason(FinishReason::Stop),
                )))
                .collect();

            Ok(Box::pin(stream::iter(chunks)))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
