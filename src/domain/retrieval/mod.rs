//! Embedding-backed storage and similarity search

mod service;
mod summary;

pub use service::Retrieval;
pub use summary::UpsertSummary;
