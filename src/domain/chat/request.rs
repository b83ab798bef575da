use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::llm::LlmStream;
use crate::domain::vector::Scope;

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub context_id: String,
    pub query: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(context_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
            query: query.into(),
            scope: Scope::default(),
            stream: false,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Answer to a [`ChatRequest`]
///
/// A streaming answer writes history when the caller drains it past the
/// finish indicator; dropping it early writes nothing.
pub enum ChatAnswer {
    Complete(String),
    Streaming(LlmStream),
}

impl fmt::Debug for ChatAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}
