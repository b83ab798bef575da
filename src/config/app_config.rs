use serde::Deserialize;

use crate::domain::llm::MessageRole;
use crate::domain::RetryPolicy;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Expected vector length; unknown models need this set
    pub dimensions: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_openai_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default)]
    pub role: MessageRole,
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreKind {
    #[default]
    InMemory,
    Pgvector,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub kind: VectorStoreKind,
    pub database_url: Option<String>,
    #[serde(default = "default_table")]
    pub default_table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Create the default table on startup
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    #[default]
    InMemory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub kind: HistoryKind,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding the template files
    #[serde(default = "default_templates_dir")]
    pub directory: String,
    #[serde(default = "default_chat_template")]
    pub chat: String,
    #[serde(default = "default_query_template")]
    pub query: String,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_openai_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_table() -> String {
    "embeddings".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_chat_template() -> String {
    "chat".to_string()
}

fn default_query_template() -> String {
    "query".to_string()
}

fn default_cache_capacity() -> u64 {
    256
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_openai_url(),
            api_key: String::new(),
            model: default_embedding_model(),
            dimensions: None,
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: default_openai_url(),
            api_key: String::new(),
            model: default_completion_model(),
            role: MessageRole::default(),
            temperature: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            kind: VectorStoreKind::default(),
            database_url: None,
            default_table: default_table(),
            max_connections: default_max_connections(),
            auto_create: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            kind: HistoryKind::default(),
            redis_url: None,
            key_prefix: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            directory: default_templates_dir(),
            chat: default_chat_template(),
            query: default_query_template(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retry::BackoffKind;
    use std::time::Duration;

    fn parse(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.vector_store.kind, VectorStoreKind::InMemory);
        assert_eq!(config.vector_store.default_table, "embeddings");
        assert_eq!(config.history.kind, HistoryKind::InMemory);
        assert_eq!(config.templates.chat, "chat");
        assert_eq!(config.completion.role, MessageRole::User);
        assert_eq!(config.embedding.retry, RetryPolicy::default());
    }

    #[test]
    fn test_sections_and_retry_policies() {
        let config = parse(
            r#"
            [completion]
            model = "llama3"
            url = "http://localhost:11434"
            role = "system"
            temperature = 0.2

            [completion.retry]
            kind = "fixed"
            base_delay = 2
            max_attempts = 4
            unit = "seconds"

            [vector_store]
            kind = "pgvector"
            database_url = "postgres://localhost/rag"

            [history]
            kind = "redis"
            redis_url = "redis://localhost:6379"
            key_prefix = "ragchain"
            "#,
        );

        assert_eq!(config.completion.model, "llama3");
        assert_eq!(config.completion.role, MessageRole::System);
        assert_eq!(config.completion.temperature, Some(0.2));

        let retry = config.completion.retry;
        assert_eq!(retry.kind(), BackoffKind::Fixed);
        assert_eq!(retry.max_attempts(), 4);
        assert_eq!(retry.base_delay(), Duration::from_secs(2));

        assert_eq!(config.vector_store.kind, VectorStoreKind::Pgvector);
        assert_eq!(config.history.kind, HistoryKind::Redis);
        assert_eq!(config.history.key_prefix.as_deref(), Some("ragchain"));
    }

    #[test]
    fn test_invalid_retry_policy_is_rejected() {
        let result: Result<AppConfig, _> = config::Config::builder()
            .add_source(config::File::from_str(
                "[embedding.retry]\nkind = \"fixed\"\nbase_delay = 10\nmax_attempts = 0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize();

        assert!(result.is_err());
    }
}
