use serde::{Deserialize, Serialize};

use super::DistanceMetric;

/// Similarity search request, already resolved to a namespace/table
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub metric: DistanceMetric,
    pub top_k: usize,
    pub namespace: String,
    pub table: String,
}

/// One hit of a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ScoredId {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Option<String>) -> Self {
        self.payload = payload;
        self
    }

    /// Payload text when stored, the identifier otherwise
    pub fn text(&self) -> &str {
        self.payload.as_deref().unwrap_or(&self.id)
    }
}

/// Ordered search hits, best match first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    metric: DistanceMetric,
    hits: Vec<ScoredId>,
}

impl QueryResult {
    /// Sorts `hits` best-first for `metric` and truncates to `top_k`
    pub fn ranked(metric: DistanceMetric, mut hits: Vec<ScoredId>, top_k: usize) -> Self {
        hits.sort_by(|a, b| metric.compare(a.score, b.score));
        hits.truncate(top_k);
        Self { metric, hits }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn hits(&self) -> &[ScoredId] {
        &self.hits
    }

    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
