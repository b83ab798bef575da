//! History store trait definition

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::HistoryContext;
use crate::domain::DomainError;

/// Keyed store of conversation history
///
/// Deleting contexts is left to whoever operates the backing store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Get a context, or an empty one when the id is unknown
    async fn get(&self, id: &str) -> Result<HistoryContext, DomainError>;

    /// Replace the accumulated response text for `id`
    async fn put(&self, id: &str, response: &str) -> Result<HistoryContext, DomainError>;

    /// Get the store type name
    fn store_type(&self) -> &'static str;
}
