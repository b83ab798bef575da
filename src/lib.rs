//! ragchain
//!
//! Retrieval-augmented generation over OpenAI-compatible endpoints:
//! - Embedding, completion, vector-store and history endpoints with retry policies
//! - Typed JSON prompt templates
//! - Lazy request pipelines and streaming history finalization

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use self::config::AppConfig;
pub use domain::{ChatAnswer, ChatRequest, DomainError, RagChain};
