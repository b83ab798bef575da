//! LLM provider implementations

mod http_client;
mod openai;

pub use http_client::{classify_status, classify_transport, ByteStream, HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
