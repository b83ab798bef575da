//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod factory;
pub mod history;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod prompt;
pub mod vector;
