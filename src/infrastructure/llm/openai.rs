use std::time::Instant;

use async_trait::async_trait;
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message,
    StreamChunk,
};
use crate::domain::llm::Usage;
use crate::infrastructure::observability::{record_llm_request, LlmRequestMetricParams};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = request.messages.iter().map(OpenAiMessage::from_domain).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": request.stream,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(ref label) = request.session_label {
            body["user"] = serde_json::json!(label);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::fatal("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::fatal("openai", "No choices in response"))?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());

        let mut llm_response = LlmResponse::new(response.id, response.model, message);

        if let Some(reason) = choice.finish_reason {
            llm_response = llm_response.with_finish_reason(FinishReason::parse(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response = llm_response.with_usage(Usage::new(
                usage.prompt_tokens,
                usage.completion_tokens,
            ));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let mut req = request;
        req.stream = false;

        let start = Instant::now();
        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);
        let result = match self.client.post_json(&url, self.headers(), &body).await {
            Ok(json) => self.parse_response(json),
            Err(e) => Err(e),
        };

        let usage = result.as_ref().ok().and_then(|r| r.usage.clone());
        record_llm_request(LlmRequestMetricParams {
            provider: self.provider_name(),
            model,
            success: result.is_ok(),
            duration: start.elapsed(),
            input_tokens: usage.as_ref().map(|u| u.prompt_tokens as u64),
            output_tokens: usage.as_ref().map(|u| u.completion_tokens as u64),
        });

        result
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError> {
        let mut req = request;
        req.stream = true;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);
        let byte_stream = self
            .client
            .post_json_stream(&url, self.headers(), &body)
            .await?;

        let model = model.to_string();
        // `None` marks the end of the body so a final unterminated line is still decoded
        let stream = byte_stream
            .map(Some)
            .chain(stream::once(future::ready(None)))
            .scan(SseDecoder::new(model), |decoder, item| {
                let events = match item {
                    Some(Ok(bytes)) => decoder.push(&bytes),
                    Some(Err(e)) => vec![Err(e)],
                    None => decoder.finish(),
                };
                future::ready(Some(stream::iter(events)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Incremental decoder for `data:` lines of a server-sent event stream
///
/// Network chunks may split a line, or a multi-byte character, anywhere.
/// Raw bytes are kept until a newline arrives and only whole lines are
/// decoded as UTF-8.
#[derive(Debug)]
struct SseDecoder {
    model: String,
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn new(model: String) -> Self {
        Self {
            model,
            buffer: Vec::new(),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, DomainError>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            events.extend(self.decode_bytes(&line));
        }
        events
    }

    /// Decode whatever is left once the body ends without a trailing newline
    fn finish(&mut self) -> Vec<Result<StreamChunk, DomainError>> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_bytes(&rest).into_iter().collect()
    }

    fn decode_bytes(&self, line: &[u8]) -> Option<Result<StreamChunk, DomainError>> {
        match std::str::from_utf8(line) {
            Ok(text) => self.decode_line(text.trim_end()),
            Err(e) => Some(Err(DomainError::stream_transport(format!(
                "Stream event is not valid UTF-8: {}",
                e
            )))),
        }
    }

    fn decode_line(&self, line: &str) -> Option<Result<StreamChunk, DomainError>> {
        let data = line.strip_prefix("data:")?.trim();

        if data.is_empty() {
            return None;
        }

        if data == "[DONE]" {
            return Some(Ok(StreamChunk::new("", self.model.clone())
                .with_finish_reason(FinishReason::Stop)));
        }

        let chunk = match serde_json::from_str::<OpenAiStreamChunk>(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                return Some(Err(DomainError::stream_transport(format!(
                    "Malformed stream event: {}",
                    e
                ))))
            }
        };

        let choice = chunk.choices.into_iter().next()?;
        let mut stream_chunk = StreamChunk::new(chunk.id, chunk.model.unwrap_or_else(|| self.model.clone()));

        if let Some(delta) = choice.delta.content {
            stream_chunk = stream_chunk.with_delta(delta);
        }

        if let Some(reason) = choice.finish_reason {
            stream_chunk = stream_chunk.with_finish_reason(FinishReason::parse(&reason));
        }

        Some(Ok(stream_chunk))
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content_text().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: String,
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    id: String,
    model: Option<String>,
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}
