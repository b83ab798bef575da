//! Vector store trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use super::{QueryResult, VectorQuery, VectorRecord};
use crate::domain::DomainError;

/// Backend holding embeddings (pgvector, in-memory, ...)
///
/// Writes with an existing id overwrite the stored record.
#[async_trait]
pub trait VectorStore: Send + Sync + Debug {
    /// Insert or overwrite one record
    async fn upsert(&self, record: VectorRecord) -> Result<(), DomainError>;

    /// Similarity search within the query's namespace/table
    async fn query(&self, query: VectorQuery) -> Result<QueryResult, DomainError>;

    /// Get the store type name
    fn store_type(&self) -> &'static str;
}
