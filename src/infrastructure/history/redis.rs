//! Redis history store

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use crate::domain::history::{HistoryContext, HistoryStore};
use crate::domain::DomainError;

const ENDPOINT: &str = "redis";

#[derive(Debug, Clone)]
pub struct RedisHistoryConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
}

impl RedisHistoryConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    fn key(&self, id: &str) -> String {
        match &self.key_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, id),
            _ => id.to_string(),
        }
    }
}

/// One JSON-encoded [`HistoryContext`] per key
#[derive(Clone)]
pub struct RedisHistoryStore {
    connection: ConnectionManager,
    config: RedisHistoryConfig,
}

impl fmt::Debug for RedisHistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisHistoryStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisHistoryStore {
    pub async fn new(config: RedisHistoryConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DomainError::configuration(format!("Failed to create Redis client: {}", e))
        })?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| classify_redis("Failed to connect to Redis", &e))?;

        Ok(Self { connection, config })
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn get(&self, id: &str) -> Result<HistoryContext, DomainError> {
        let mut conn = self.connection.clone();

        let raw: Option<String> = conn
            .get(self.config.key(id))
            .await
            .map_err(|e| classify_redis(&format!("Failed to get history '{}'", id), &e))?;

        match raw {
            Some(json) => decode(id, &json),
            None => Ok(HistoryContext::empty(id)),
        }
    }

    async fn put(&self, id: &str, response: &str) -> Result<HistoryContext, DomainError> {
        let context = HistoryContext::new(id, response);
        let json = serde_json::to_string(&context)
            .map_err(|e| DomainError::internal(format!("Failed to encode history: {}", e)))?;

        let mut conn = self.connection.clone();
        let _: () = conn
            .set(self.config.key(id), json)
            .await
            .map_err(|e| classify_redis(&format!("Failed to put history '{}'", id), &e))?;

        Ok(context)
    }

    fn store_type(&self) -> &'static str {
        "redis"
    }
}

fn decode(id: &str, json: &str) -> Result<HistoryContext, DomainError> {
    serde_json::from_str(json).map_err(|e| {
        DomainError::fatal(ENDPOINT, format!("Corrupt history value for '{}': {}", id, e))
    })
}

fn classify_redis(context: &str, error: &RedisError) -> DomainError {
    let message = format!("{}: {}", context, error);

    if error.is_io_error() || error.is_timeout() || error.is_connection_dropped() {
        DomainError::transient(ENDPOINT, message)
    } else {
        DomainError::fatal(ENDPOINT, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefix() {
        let config = RedisHistoryConfig::new("redis://localhost");
        assert_eq!(config.key("ctx-1"), "ctx-1");

        let config = config.with_key_prefix("ragchain:history");
        assert_eq!(config.key("ctx-1"), "ragchain:history:ctx-1");
    }

    #[test]
    fn test_decode_round_trips_stored_json() {
        let context = HistoryContext::new("ctx-1", "what?answer");
        let json = serde_json::to_string(&context).unwrap();

        assert_eq!(decode("ctx-1", &json).unwrap(), context);
    }

    #[test]
    fn test_decode_corrupt_value_is_fatal() {
        let result = decode("ctx-1", "not json");
        assert!(matches!(result, Err(DomainError::FatalEndpoint { .. })));
    }
}
