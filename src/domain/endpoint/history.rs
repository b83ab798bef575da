use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, instrument};

use super::Endpoint;
use crate::domain::history::{HistoryContext, HistoryStore};
use crate::domain::DomainError;

/// Conversation history access with retries
#[derive(Clone)]
pub struct HistoryEndpoint {
    endpoint: Endpoint,
    store: Arc<dyn HistoryStore>,
}

impl HistoryEndpoint {
    pub fn new(endpoint: Endpoint, store: Arc<dyn HistoryStore>) -> Self {
        Self { endpoint, store }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint.name()))]
    pub async fn get(&self, id: &str) -> Result<HistoryContext, DomainError> {
        validate_id(id)?;

        self.endpoint
            .call("history_get", || {
                let store = self.store.clone();
                let id = id.to_string();
                async move { store.get(&id).await }
            })
            .await
    }

    #[instrument(skip(self, response), fields(endpoint = %self.endpoint.name(), len = response.len()))]
    pub async fn put(&self, id: &str, response: &str) -> Result<HistoryContext, DomainError> {
        validate_id(id)?;

        let context = self
            .endpoint
            .call("history_put", || {
                let store = self.store.clone();
                let id = id.to_string();
                let response = response.to_string();
                async move { store.put(&id, &response).await }
            })
            .await?;

        counter!("ragchain_history_writes_total", "store" => self.store.store_type()).increment(1);
        debug!(id, "History written");

        Ok(context)
    }

    /// Start an empty history for `id`
    pub async fn init(&self, id: &str) -> Result<HistoryContext, DomainError> {
        self.put(id, "").await
    }
}

impl fmt::Debug for HistoryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEndpoint")
            .field("endpoint", &self.endpoint)
            .field("store", &self.store.store_type())
            .finish()
    }
}

fn validate_id(id: &str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::validation("History id cannot be empty"));
    }
    Ok(())
}
