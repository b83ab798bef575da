use std::sync::Arc;

use tracing::instrument;

use super::Endpoint;
use crate::domain::vector::{QueryResult, VectorQuery, VectorRecord, VectorStore};
use crate::domain::DomainError;

/// Vector database access with retries
#[derive(Debug, Clone)]
pub struct VectorStoreEndpoint {
    endpoint: Endpoint,
    store: Arc<dyn VectorStore>,
    default_table: String,
}

impl VectorStoreEndpoint {
    pub fn new(endpoint: Endpoint, store: Arc<dyn VectorStore>, default_table: impl Into<String>) -> Self {
        Self {
            endpoint,
            store,
            default_table: default_table.into(),
        }
    }

    /// Table used when a scope leaves it blank
    pub fn default_table(&self) -> &str {
        &self.default_table
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[instrument(
        skip(self, record),
        fields(endpoint = %self.endpoint.name(), id = %record.id, namespace = %record.namespace)
    )]
    pub async fn upsert(&self, record: VectorRecord) -> Result<(), DomainError> {
        if record.vector.is_empty() {
            return Err(DomainError::validation("Cannot store an empty vector"));
        }

        self.endpoint
            .call("upsert", || {
                let store = self.store.clone();
                let record = record.clone();
                async move { store.upsert(record).await }
            })
            .await
    }

    #[instrument(
        skip(self, query),
        fields(endpoint = %self.endpoint.name(), metric = %query.metric, top_k = query.top_k)
    )]
    pub async fn query(&self, query: VectorQuery) -> Result<QueryResult, DomainError> {
        if query.top_k == 0 {
            return Err(DomainError::validation("top_k must be at least 1"));
        }

        self.endpoint
            .call("query", || {
                let store = self.store.clone();
                let query = query.clone();
                async move { store.query(query).await }
            })
            .await
    }
}
