//! In-memory vector store for development and testing

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::vector::{QueryResult, ScoredId, VectorQuery, VectorRecord, VectorStore};
use crate::domain::DomainError;

type Partition = (String, String);

/// Exact-scan store partitioned by namespace and table
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorStore {
    partitions: Arc<RwLock<HashMap<Partition, HashMap<String, VectorRecord>>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all partitions
    pub async fn len(&self) -> usize {
        self.partitions.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<(), DomainError> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .entry((record.namespace.clone(), record.table.clone()))
            .or_default();

        if let Some(existing) = partition.values().next() {
            if existing.dimensions() != record.dimensions() {
                return Err(DomainError::fatal(
                    "in_memory",
                    format!(
                        "Dimension mismatch in {}/{}: expected {}, got {}",
                        record.namespace,
                        record.table,
                        existing.dimensions(),
                        record.dimensions()
                    ),
                ));
            }
        }

        partition.insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(&self, query: VectorQuery) -> Result<QueryResult, DomainError> {
        let partitions = self.partitions.read().await;
        let key = (query.namespace.clone(), query.table.clone());

        let hits = partitions
            .get(&key)
            .map(|records| {
                records
                    .values()
                    .map(|r| {
                        ScoredId::new(&r.id, query.metric.score(&query.vector, &r.vector))
                            .with_payload(r.payload.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(QueryResult::ranked(query.metric, hits, query.top_k))
    }

    fn store_type(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DistanceMetric;

    fn record(id: &str, vector: Vec<f32>, namespace: &str) -> VectorRecord {
        VectorRecord::new(id, vector, namespace, "embeddings").with_payload(format!("text {}", id))
    }

    fn query(vector: Vec<f32>, metric: DistanceMetric, top_k: usize, namespace: &str) -> VectorQuery {
        VectorQuery {
            vector,
            metric,
            top_k,
            namespace: namespace.to_string(),
            table: "embeddings".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = InMemoryVectorStore::new();

        store.upsert(record("a", vec![1.0, 0.0], "ns")).await.unwrap();
        store
            .upsert(record("a", vec![0.0, 1.0], "ns").with_payload("replaced"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);

        let result = store
            .query(query(vec![0.0, 1.0], DistanceMetric::L2, 5, "ns"))
            .await
            .unwrap();
        assert_eq!(result.hits()[0].text(), "replaced");
        assert_eq!(result.hits()[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_metric() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("near", vec![1.0, 0.0], "ns")).await.unwrap();
        store.upsert(record("far", vec![-3.0, 0.0], "ns")).await.unwrap();
        store.upsert(record("mid", vec![3.0, 0.0], "ns")).await.unwrap();

        let l2 = store
            .query(query(vec![1.0, 0.0], DistanceMetric::L2, 3, "ns"))
            .await
            .unwrap();
        assert_eq!(l2.ids(), vec!["near", "mid", "far"]);

        let ip = store
            .query(query(vec![1.0, 0.0], DistanceMetric::InnerProduct, 3, "ns"))
            .await
            .unwrap();
        assert_eq!(ip.ids(), vec!["mid", "near", "far"]);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("a", vec![1.0], "one")).await.unwrap();
        store.upsert(record("b", vec![1.0], "two")).await.unwrap();

        let result = store
            .query(query(vec![1.0], DistanceMetric::L2, 10, "one"))
            .await
            .unwrap();
        assert_eq!(result.ids(), vec!["a"]);

        let empty = store
            .query(query(vec![1.0], DistanceMetric::L2, 10, "three"))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let store = InMemoryVectorStore::new();
        store.upsert(record("a", vec![1.0, 0.0], "ns")).await.unwrap();

        let result = store.upsert(record("b", vec![1.0], "ns")).await;
        assert!(matches!(result, Err(DomainError::FatalEndpoint { .. })));
    }
}
