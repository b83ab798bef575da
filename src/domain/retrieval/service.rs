use futures::future::join_all;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::UpsertSummary;
use crate::domain::endpoint::{EmbeddingEndpoint, VectorStoreEndpoint};
use crate::domain::vector::{DistanceMetric, QueryResult, Scope, VectorQuery, VectorRecord};
use crate::domain::DomainError;

/// Embeds text and reads/writes the vector store
#[derive(Debug, Clone)]
pub struct Retrieval {
    embedding: EmbeddingEndpoint,
    vectors: VectorStoreEndpoint,
}

impl Retrieval {
    pub fn new(embedding: EmbeddingEndpoint, vectors: VectorStoreEndpoint) -> Self {
        Self { embedding, vectors }
    }

    pub fn embedding(&self) -> &EmbeddingEndpoint {
        &self.embedding
    }

    pub fn vectors(&self) -> &VectorStoreEndpoint {
        &self.vectors
    }

    /// Embed `text` and store it under a fresh id; returns that id
    ///
    /// Every call creates a new record, even for text already stored.
    #[instrument(skip(self, text), fields(namespace = %scope.namespace()))]
    pub async fn upsert(&self, text: &str, scope: &Scope) -> Result<String, DomainError> {
        let vector = self.embedding.embed(text).await?;

        let record = VectorRecord::new(
            Uuid::new_v4().to_string(),
            vector,
            scope.namespace(),
            scope.table_or(self.vectors.default_table()),
        )
        .with_payload(text);
        let id = record.id.clone();

        self.vectors.upsert(record).await?;
        Ok(id)
    }

    /// Upsert every chunk concurrently
    ///
    /// A failing chunk does not stop the others; see the returned summary.
    pub async fn upsert_all(&self, chunks: &[String], scope: &Scope) -> UpsertSummary {
        let results = join_all(chunks.iter().map(|chunk| self.upsert(chunk, scope))).await;
        let summary = UpsertSummary::new(results);

        if summary.is_complete() {
            info!(chunks = summary.succeeded(), namespace = %scope.namespace(), "Chunks upserted");
        } else {
            warn!(
                succeeded = summary.succeeded(),
                failed = summary.failed(),
                namespace = %scope.namespace(),
                "Some chunks failed to upsert"
            );
        }

        summary
    }

    #[instrument(skip(self, embedding), fields(namespace = %scope.namespace()))]
    pub async fn query(
        &self,
        embedding: Vec<f32>,
        metric: DistanceMetric,
        top_k: usize,
        scope: &Scope,
    ) -> Result<QueryResult, DomainError> {
        let query = VectorQuery {
            vector: embedding,
            metric,
            top_k,
            namespace: scope.namespace().to_string(),
            table: scope.table_or(self.vectors.default_table()).to_string(),
        };

        self.vectors.query(query).await
    }

    /// Embed `text`, then query with its vector
    pub async fn query_text(
        &self,
        text: &str,
        metric: DistanceMetric,
        top_k: usize,
        scope: &Scope,
    ) -> Result<QueryResult, DomainError> {
        let embedding = self.embedding.embed(text).await?;
        self.query(embedding, metric, top_k, scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::endpoint::Endpoint;
    use crate::domain::retry::RetryPolicy;
    use crate::domain::vector::MockVectorStore;

    fn retrieval(embedder: MockEmbeddingProvider) -> (Retrieval, Arc<MockVectorStore>) {
        let store = Arc::new(MockVectorStore::new());
        let embedding = EmbeddingEndpoint::new(
            Endpoint::new("embedding", RetryPolicy::default()),
            Arc::new(embedder),
            "mock-embedding",
        );
        let vectors = VectorStoreEndpoint::new(
            Endpoint::new("vectors", RetryPolicy::default()),
            store.clone(),
            "embeddings",
        );
        (Retrieval::new(embedding, vectors), store)
    }

    fn geometric() -> MockEmbeddingProvider {
        MockEmbeddingProvider::new("mock", 2)
            .with_vector("origin", vec![0.0, 0.0])
            .with_vector("near", vec![1.0, 0.0])
            .with_vector("far", vec![3.0, 0.0])
            .with_vector("farther", vec![6.0, 0.0])
            .with_vector("opposite", vec![-2.0, 0.0])
            .with_vector("probe", vec![1.0, 0.0])
    }

    async fn seed(retrieval: &Retrieval, scope: &Scope) {
        for text in ["origin", "near", "far", "farther", "opposite"] {
            retrieval.upsert(text, scope).await.unwrap();
        }
    }

    fn payloads(result: &QueryResult) -> Vec<&str> {
        result.hits().iter().map(|h| h.text()).collect()
    }

    #[tokio::test]
    async fn test_same_text_twice_creates_two_records() {
        let (retrieval, store) = retrieval(geometric());
        let scope = Scope::default();

        let first = retrieval.upsert("near", &scope).await.unwrap();
        let second = retrieval.upsert("near", &scope).await.unwrap();
        assert_ne!(first, second);

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.payload.as_deref() == Some("near")));

        let result = retrieval
            .query_text("probe", DistanceMetric::L2, 5, &scope)
            .await
            .unwrap();
        assert_eq!(payloads(&result), vec!["near", "near"]);
    }

    #[tokio::test]
    async fn test_l2_ranks_closest_first() {
        let (retrieval, _) = retrieval(geometric());
        let scope = Scope::default();
        seed(&retrieval, &scope).await;

        let result = retrieval
            .query_text("probe", DistanceMetric::L2, 3, &scope)
            .await
            .unwrap();

        assert_eq!(payloads(&result), vec!["near", "origin", "far"]);
        let scores: Vec<f32> = result.hits().iter().map(|h| h.score).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_inner_product_ranks_largest_first() {
        let (retrieval, _) = retrieval(geometric());
        let scope = Scope::default();
        seed(&retrieval, &scope).await;

        let result = retrieval
            .query(vec![1.0, 0.0], DistanceMetric::InnerProduct, 3, &scope)
            .await
            .unwrap();

        assert_eq!(payloads(&result), vec!["farther", "far", "near"]);
        let scores: Vec<f32> = result.hits().iter().map(|h| h.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_blank_namespace_and_top_k() {
        let (retrieval, store) = retrieval(geometric());
        let scope = Scope::new("", "");
        seed(&retrieval, &scope).await;

        assert!(store
            .records()
            .iter()
            .all(|r| r.namespace == "knowledge" && r.table == "embeddings"));

        let result = retrieval
            .query_text("probe", DistanceMetric::L2, 3, &Scope::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let (retrieval, _) = retrieval(geometric());
        retrieval
            .upsert("near", &Scope::default().with_namespace("ml"))
            .await
            .unwrap();

        let result = retrieval
            .query_text("probe", DistanceMetric::L2, 3, &Scope::default())
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_all_reports_each_chunk() {
        let (retrieval, store) = retrieval(geometric());
        let chunks = vec!["near".to_string(), "   ".to_string(), "far".to_string()];

        let summary = retrieval.upsert_all(&chunks, &Scope::default()).await;

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(matches!(summary.errors()[0], DomainError::Validation { .. }));
        assert_eq!(store.records().len(), 2);
        assert!(summary.into_result().is_err());
    }
}
