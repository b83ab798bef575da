use std::sync::Arc;

use futures::{stream, StreamExt};
use tracing::instrument;

use super::Endpoint;
use crate::domain::llm::{LlmProvider, LlmRequest, LlmResponse, LlmStream, Message, MessageRole};
use crate::domain::DomainError;

/// Per-call overrides; unset fields fall back to the endpoint defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub stream: bool,
    pub temperature: Option<f32>,
    pub role: Option<MessageRole>,
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_role(mut self, role: MessageRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Outcome of a completion call
pub enum Completion {
    Single(LlmResponse),
    Stream(LlmStream),
}

impl Completion {
    /// View either variant as a fragment stream; a single response becomes one terminal fragment
    pub fn into_stream(self) -> LlmStream {
        match self {
            Self::Single(response) => Box::pin(stream::once(async move { Ok(response.into_chunk()) })),
            Self::Stream(stream) => stream,
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(response) => f.debug_tuple("Single").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Chat completion bound to one model and its defaults
#[derive(Debug, Clone)]
pub struct CompletionEndpoint {
    endpoint: Endpoint,
    provider: Arc<dyn LlmProvider>,
    model: String,
    role: MessageRole,
    temperature: Option<f32>,
}

impl CompletionEndpoint {
    pub fn new(endpoint: Endpoint, provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            provider,
            model: model.into(),
            role: MessageRole::User,
            temperature: None,
        }
    }

    pub fn with_role(mut self, role: MessageRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn build_request(&self, prompt: &str, session_label: &str, options: &ChatOptions) -> LlmRequest {
        let role = options.role.unwrap_or(self.role);

        let mut builder = LlmRequest::builder()
            .message(Message::new(role, prompt))
            .stream(options.stream);

        if !session_label.is_empty() {
            builder = builder.session_label(session_label);
        }
        if let Some(temperature) = options.temperature.or(self.temperature) {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder.build()
    }

    /// Send `prompt` as a single message
    ///
    /// When streaming, the retry policy only covers opening the stream. Any
    /// error surfacing afterwards is delivered as a `StreamTransport` item.
    #[instrument(
        skip(self, prompt, options),
        fields(endpoint = %self.endpoint.name(), model = %self.model, stream = options.stream)
    )]
    pub async fn complete(
        &self,
        prompt: &str,
        session_label: &str,
        options: &ChatOptions,
    ) -> Result<Completion, DomainError> {
        let request = self.build_request(prompt, session_label, options);

        if !options.stream {
            let response = self
                .endpoint
                .call("chat", || {
                    let provider = self.provider.clone();
                    let request = request.clone();
                    let model = self.model.clone();
                    async move { provider.chat(&model, request).await }
                })
                .await?;

            return Ok(Completion::Single(response));
        }

        let stream = self
            .endpoint
            .call("chat_stream", || {
                let provider = self.provider.clone();
                let request = request.clone();
                let model = self.model.clone();
                async move { provider.chat_stream(&model, request).await }
            })
            .await?;

        let stream = stream.map(|item| {
            item.map_err(|e| match e {
                DomainError::StreamTransport { .. } => e,
                other => DomainError::stream_transport(other.to_string()),
            })
        });

        Ok(Completion::Stream(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    use crate::domain::llm::{MockLlmProvider, StreamChunk};
    use crate::domain::retry::{RetryPolicy, TimeUnit};

    fn endpoint(provider: MockLlmProvider) -> (CompletionEndpoint, Arc<MockLlmProvider>) {
        let provider = Arc::new(provider);
        let policy = RetryPolicy::exponential(50, 2.0, 3, TimeUnit::Milliseconds).unwrap();
        let endpoint = CompletionEndpoint::new(
            Endpoint::new("completion", policy),
            provider.clone(),
            "gpt-4o-mini",
        )
        .with_temperature(0.2);
        (endpoint, provider)
    }

    #[tokio::test]
    async fn test_single_completion_uses_defaults() {
        let (endpoint, provider) = endpoint(MockLlmProvider::new("mock").with_content("Hi"));

        let completion = endpoint
            .complete("Hello", "chat", &ChatOptions::default())
            .await
            .unwrap();

        match completion {
            Completion::Single(response) => assert_eq!(response.content(), "Hi"),
            other => panic!("Expected single response, got {:?}", other),
        }

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::User);
        assert_eq!(requests[0].temperature, Some(0.2));
        assert_eq!(requests[0].session_label.as_deref(), Some("chat"));
        assert!(!requests[0].stream);
    }

    #[tokio::test]
    async fn test_options_override_defaults() {
        let (endpoint, provider) = endpoint(MockLlmProvider::new("mock").with_content("Hi"));
        let options = ChatOptions::default()
            .with_role(MessageRole::System)
            .with_temperature(0.9)
            .with_max_tokens(64);

        endpoint.complete("Hello", "", &options).await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.temperature, Some(0.9));
        assert_eq!(request.max_tokens, Some(64));
        assert!(request.session_label.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_establishment_is_retried() {
        let (endpoint, provider) = endpoint(
            MockLlmProvider::new("mock")
                .with_content("ab")
                .with_transient_failures(2),
        );

        let completion = endpoint
            .complete("Hello", "chat", &ChatOptions::default().with_stream(true))
            .await
            .unwrap();
        assert!(matches!(completion, Completion::Stream(_)));
        assert_eq!(provider.calls(), 3);

        let chunks: Vec<StreamChunk> = completion.into_stream().try_collect().await.unwrap();
        let text: String = chunks.iter().map(|c| c.delta_text()).collect();
        assert_eq!(text, "ab");
        assert!(chunks.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_mid_stream_fault_is_a_transport_error() {
        let (endpoint, provider) = endpoint(MockLlmProvider::new("mock").with_chunks(vec![
            Ok(StreamChunk::new("id", "m").with_delta("a")),
            Err("connection reset".to_string()),
        ]));

        let completion = endpoint
            .complete("Hello", "chat", &ChatOptions::default().with_stream(true))
            .await
            .unwrap();

        let items: Vec<_> = completion.into_stream().collect().await;
        assert_eq!(provider.calls(), 1);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(DomainError::StreamTransport { .. })));
    }

    #[tokio::test]
    async fn test_single_response_as_stream() {
        let (endpoint, _) = endpoint(MockLlmProvider::new("mock").with_content("Hi"));

        let completion = endpoint
            .complete("Hello", "chat", &ChatOptions::default())
            .await
            .unwrap();

        let chunks: Vec<StreamChunk> = completion.into_stream().try_collect().await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_terminal());
        assert_eq!(chunks[0].delta_text(), "Hi");
    }
}
