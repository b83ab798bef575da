//! Observability infrastructure - Tracing, Metrics, and Logging

mod config;
mod metrics;
mod tracing_setup;

pub use self::config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use self::metrics::{init_metrics, record_llm_request, LlmRequestMetricParams};
pub use tracing_setup::{init_tracing, shutdown_tracing};
