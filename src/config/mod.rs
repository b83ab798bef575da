//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CompletionConfig, EmbeddingConfig, HistoryConfig, HistoryKind, LogFormat,
    LoggingConfig, TemplatesConfig, VectorStoreConfig, VectorStoreKind,
};
