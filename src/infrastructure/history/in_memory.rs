//! In-memory history store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::history::{HistoryContext, HistoryStore};
use crate::domain::DomainError;

#[derive(Debug, Default, Clone)]
pub struct InMemoryHistoryStore {
    contexts: Arc<RwLock<HashMap<String, HistoryContext>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get(&self, id: &str) -> Result<HistoryContext, DomainError> {
        Ok(self
            .contexts
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_else(|| HistoryContext::empty(id)))
    }

    async fn put(&self, id: &str, response: &str) -> Result<HistoryContext, DomainError> {
        let context = HistoryContext::new(id, response);
        self.contexts
            .write()
            .await
            .insert(id.to_string(), context.clone());
        Ok(context)
    }

    fn store_type(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_id_is_empty() {
        let store = InMemoryHistoryStore::new();
        let context = store.get("ctx-1").await.unwrap();

        assert_eq!(context.id, "ctx-1");
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_put_replaces_response() {
        let store = InMemoryHistoryStore::new();

        store.put("ctx-1", "first").await.unwrap();
        store.put("ctx-1", "second").await.unwrap();

        assert_eq!(store.get("ctx-1").await.unwrap().response, "second");
        assert!(store.get("ctx-2").await.unwrap().is_empty());
    }
}
