//! Wires endpoints, stores and the RAG chain from [`AppConfig`]

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{
    AppConfig, CompletionConfig, EmbeddingConfig, HistoryConfig, HistoryKind, TemplatesConfig,
    VectorStoreConfig, VectorStoreKind,
};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::history::HistoryStore;
use crate::domain::vector::VectorStore;
use crate::domain::{
    ChatSettings, CompletionEndpoint, DomainError, EmbeddingEndpoint, Endpoint, HistoryEndpoint,
    RagChain, Retrieval, TemplateCache, VectorStoreEndpoint,
};
use crate::infrastructure::embedding::OpenAiEmbeddingProvider;
use crate::infrastructure::history::{InMemoryHistoryStore, RedisHistoryConfig, RedisHistoryStore};
use crate::infrastructure::llm::{HttpClient, OpenAiProvider};
use crate::infrastructure::prompt::FileTemplateSource;
use crate::infrastructure::vector::{InMemoryVectorStore, PgvectorConfig, PgvectorStore};

#[derive(Debug)]
pub struct RagChainFactory;

impl RagChainFactory {
    /// Build every endpoint and store, then the chain on top of them
    pub async fn build(config: &AppConfig) -> Result<RagChain, DomainError> {
        let embedding = Self::embedding_endpoint(&config.embedding)?;
        let completion = Self::completion_endpoint(&config.completion)?;

        let store = Self::vector_store(&config.vector_store, embedding.dimensions()).await?;
        let vectors = VectorStoreEndpoint::new(
            Endpoint::new(store.store_type(), config.vector_store.retry),
            store,
            &config.vector_store.default_table,
        );

        let history_store = Self::history_store(&config.history).await?;
        let history = HistoryEndpoint::new(
            Endpoint::new(history_store.store_type(), config.history.retry),
            history_store,
        );

        let templates = Self::template_cache(&config.templates);
        let settings = ChatSettings {
            chat_template: config.templates.chat.clone(),
            query_template: config.templates.query.clone(),
            max_tokens: config.completion.max_tokens,
        };

        info!(
            embedding_model = embedding.model(),
            completion_model = completion.model(),
            vector_store = ?config.vector_store.kind,
            history = ?config.history.kind,
            "RAG chain configured"
        );

        Ok(RagChain::new(
            Retrieval::new(embedding, vectors),
            completion,
            history,
            templates,
            settings,
        ))
    }

    pub fn embedding_endpoint(config: &EmbeddingConfig) -> Result<EmbeddingEndpoint, DomainError> {
        let client = HttpClient::with_timeout("embedding", Duration::from_secs(config.timeout_secs))?;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbeddingProvider::with_base_url(
            client,
            &config.api_key,
            &config.url,
        ));

        let endpoint = Endpoint::new("embedding", config.retry).with_url(&config.url);
        let mut embedding = EmbeddingEndpoint::new(endpoint, provider, &config.model);

        if let Some(dimensions) = config.dimensions {
            embedding = embedding.with_dimensions(dimensions);
        }

        Ok(embedding)
    }

    pub fn completion_endpoint(config: &CompletionConfig) -> Result<CompletionEndpoint, DomainError> {
        let client = HttpClient::with_timeout("completion", Duration::from_secs(config.timeout_secs))?;
        let provider = Arc::new(OpenAiProvider::with_base_url(client, &config.api_key, &config.url));

        let endpoint = Endpoint::new("completion", config.retry).with_url(&config.url);
        let mut completion =
            CompletionEndpoint::new(endpoint, provider, &config.model).with_role(config.role);

        if let Some(temperature) = config.temperature {
            completion = completion.with_temperature(temperature);
        }

        Ok(completion)
    }

    pub async fn vector_store(
        config: &VectorStoreConfig,
        dimensions: Option<usize>,
    ) -> Result<Arc<dyn VectorStore>, DomainError> {
        match config.kind {
            VectorStoreKind::InMemory => Ok(Arc::new(InMemoryVectorStore::new())),
            VectorStoreKind::Pgvector => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("vector_store.database_url is required for pgvector")
                })?;
                let dimensions = dimensions.ok_or_else(|| {
                    DomainError::configuration(
                        "embedding.dimensions is required for pgvector with this model",
                    )
                })?;

                let pg_config = PgvectorConfig::new(url, dimensions)
                    .with_max_connections(config.max_connections)
                    .with_auto_create(config.auto_create);
                let store = PgvectorStore::connect(&pg_config).await?;

                if config.auto_create {
                    store.ensure_table(&config.default_table).await?;
                }

                Ok(Arc::new(store))
            }
        }
    }

    pub async fn history_store(config: &HistoryConfig) -> Result<Arc<dyn HistoryStore>, DomainError> {
        match config.kind {
            HistoryKind::InMemory => Ok(Arc::new(InMemoryHistoryStore::new())),
            HistoryKind::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("history.redis_url is required for redis")
                })?;

                let mut redis_config = RedisHistoryConfig::new(url);
                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix);
                }

                Ok(Arc::new(RedisHistoryStore::new(redis_config).await?))
            }
        }
    }

    pub fn template_cache(config: &TemplatesConfig) -> TemplateCache {
        let source = Arc::new(FileTemplateSource::new(&config.directory));
        TemplateCache::with_capacity(source, config.cache_capacity)
    }
}
