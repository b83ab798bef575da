use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated conversation text for one context id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryContext {
    pub id: String,
    pub response: String,
    pub updated_at: DateTime<Utc>,
}

impl HistoryContext {
    /// Empty context for an id that has never been written
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            response: String::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn new(id: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            response: response.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }
}
