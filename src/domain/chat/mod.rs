//! RAG conversation flows

mod chain;
mod request;

pub use chain::{ChatSettings, RagChain};
pub use request::{ChatAnswer, ChatRequest};
