//! Remote capabilities wrapped in a retry policy

mod completion;
mod base;
mod embedding;
mod history;
mod vector;

pub use completion::{ChatOptions, Completion, CompletionEndpoint};
pub use base::Endpoint;
pub use embedding::EmbeddingEndpoint;
pub use history::HistoryEndpoint;
pub use vector::VectorStoreEndpoint;
