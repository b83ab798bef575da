//! Vector store domain models and traits

mod metric;
mod query;
mod record;
mod store;

pub use metric::{dot_product, euclidean_distance, DistanceMetric, ScoreOrder};
pub use query::{QueryResult, ScoredId, VectorQuery};
pub use record::{Scope, VectorRecord, DEFAULT_NAMESPACE};
pub use store::VectorStore;

#[cfg(test)]
pub use store::mock::MockVectorStore;
