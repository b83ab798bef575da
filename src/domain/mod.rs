//! Domain layer - Core business logic and entities

pub mod chat;
pub mod embedding;
pub mod endpoint;
pub mod error;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod retry;
pub mod stream;
pub mod vector;

pub use chat::{ChatAnswer, ChatRequest, ChatSettings, RagChain};
pub use embedding::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
pub use endpoint::{
    ChatOptions, Completion, CompletionEndpoint, EmbeddingEndpoint, Endpoint, HistoryEndpoint,
    VectorStoreEndpoint,
};
pub use error::DomainError;
pub use history::{HistoryContext, HistoryStore};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message, MessageRole,
    StreamChunk,
};
pub use pipeline::{Diagnostics, Pipeline, PipelineStream};
pub use prompt::{PromptTemplate, TemplateCache, TemplateSource, TemplateValue};
pub use retrieval::{Retrieval, UpsertSummary};
pub use retry::{RetryPolicy, TimeUnit};
pub use stream::{Finalized, StreamAggregator};
pub use vector::{DistanceMetric, QueryResult, Scope, VectorQuery, VectorRecord, VectorStore};
