use std::sync::Arc;

use tracing::instrument;

use super::Endpoint;
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;

/// Turns text into vectors through an embedding provider
#[derive(Debug, Clone)]
pub struct EmbeddingEndpoint {
    endpoint: Endpoint,
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    dimensions: Option<usize>,
}

impl EmbeddingEndpoint {
    pub fn new(
        endpoint: Endpoint,
        provider: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            provider,
            model: model.into(),
            dimensions: None,
        }
    }

    /// Reject vectors whose length differs from `dimensions`
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
            .or_else(|| self.provider.dimensions(&self.model))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[instrument(skip(self, text), fields(endpoint = %self.endpoint.name(), model = %self.model))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("Cannot embed empty text"));
        }

        let mut request = EmbeddingRequest::single(&self.model, text);
        if let Some(dimensions) = self.dimensions {
            request = request.with_dimensions(dimensions);
        }

        let response = self
            .endpoint
            .call("embed", || {
                let provider = self.provider.clone();
                let request = request.clone();
                async move { provider.embed(request).await }
            })
            .await?;

        let vector = response.into_first_vector().ok_or_else(|| {
            DomainError::fatal(self.endpoint.name(), "Embedding response contained no vectors")
        })?;

        if let Some(expected) = self.dimensions {
            if vector.len() != expected {
                return Err(DomainError::fatal(
                    self.endpoint.name(),
                    format!(
                        "Expected {} dimensions, provider returned {}",
                        expected,
                        vector.len()
                    ),
                ));
            }
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::retry::{RetryPolicy, TimeUnit};

    fn endpoint(provider: MockEmbeddingProvider) -> (EmbeddingEndpoint, Arc<MockEmbeddingProvider>) {
        let provider = Arc::new(provider);
        let policy = RetryPolicy::fixed(10, 3, TimeUnit::Milliseconds).unwrap();
        let endpoint = EmbeddingEndpoint::new(
            Endpoint::new("embedding", policy),
            provider.clone(),
            "text-embedding-3-small",
        );
        (endpoint, provider)
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let (endpoint, _) = endpoint(MockEmbeddingProvider::new("mock", 4));

        let vector = endpoint.embed("hello").await.unwrap();
        assert_eq!(vector.len(), 4);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let (endpoint, _) = endpoint(MockEmbeddingProvider::new("mock", 4));
        let endpoint = endpoint.with_dimensions(8);

        let result = endpoint.embed("hello").await;
        assert!(matches!(result, Err(DomainError::FatalEndpoint { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let (endpoint, provider) =
            endpoint(MockEmbeddingProvider::new("mock", 4).with_transient_failures(2));

        assert!(endpoint.embed("hello").await.is_ok());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let (endpoint, provider) = endpoint(MockEmbeddingProvider::new("mock", 4));

        let result = endpoint.embed("   ").await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(provider.calls(), 0);
    }
}
