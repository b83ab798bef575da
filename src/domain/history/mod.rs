//! Conversation history domain models and traits

mod entity;
mod store;

pub use entity::HistoryContext;
pub use store::HistoryStore;

#[cfg(test)]
pub use store::MockHistoryStore;
