//! Turning completion fragments into a history entry

mod aggregator;

pub use aggregator::{AggregatorState, Finalized, StreamAggregator};
