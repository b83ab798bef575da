//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the embedding dimensions for a model, when known
    fn dimensions(&self, model: &str) -> Option<usize>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::domain::embedding::{Embedding, EmbeddingUsage};

    /// Deterministic embedder; explicit vectors can be pinned per text
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        name: &'static str,
        dimensions: usize,
        fixed: HashMap<String, Vec<f32>>,
        error: Option<String>,
        transient_failures: AtomicU32,
        calls: AtomicU32,
    }

    impl MockEmbeddingProvider {
        pub fn new(name: &'static str, dimensions: usize) -> Self {
            Self {
                name,
                dimensions,
                fixed: HashMap::new(),
                error: None,
                transient_failures: AtomicU32::new(0),
                calls: AtomicU32::new(0),
            }
        }

        pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.fixed.insert(text.into(), vector);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_transient_failures(self, count: u32) -> Self {
            self.transient_failures.store(count, Ordering::SeqCst);
            self
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            if let Some(vector) = self.fixed.get(text) {
                return vector.clone();
            }

            let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
            (0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(ref error) = self.error {
                return Err(DomainError::fatal(self.name, error));
            }

            let left = self.transient_failures.load(Ordering::SeqCst);
            if left > 0 {
                self.transient_failures.store(left - 1, Ordering::SeqCst);
                return Err(DomainError::transient(self.name, "HTTP 429"));
            }

            let embeddings: Vec<Embedding> = request
                .inputs()
                .iter()
                .enumerate()
                .map(|(idx, text)| Embedding::new(idx, self.vector_for(text)))
                .collect();

            Ok(EmbeddingResponse::new(
                request.model(),
                embeddings,
                EmbeddingUsage::new(1, 1),
            ))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn dimensions(&self, _model: &str) -> Option<usize> {
            Some(self.dimensions)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new("test", 8);

            let first = provider
                .embed(EmbeddingRequest::single("mock", "Hello"))
                .await
                .unwrap();
            let second = provider
                .embed(EmbeddingRequest::single("mock", "Hello"))
                .await
                .unwrap();

            assert_eq!(first.embeddings()[0].vector(), second.embeddings()[0].vector());
            assert_eq!(first.embeddings()[0].dimensions(), 8);
        }

        #[tokio::test]
        async fn test_pinned_vector() {
            let provider = MockEmbeddingProvider::new("test", 2).with_vector("q", vec![1.0, 0.0]);

            let response = provider
                .embed(EmbeddingRequest::single("mock", "q"))
                .await
                .unwrap();

            assert_eq!(response.into_first_vector(), Some(vec![1.0, 0.0]));
        }
    }
}
