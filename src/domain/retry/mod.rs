//! Retry policies bound to endpoints

mod policy;

pub use policy::{BackoffKind, RetryPolicy, TimeUnit};
