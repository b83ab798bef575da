//! Prometheus metrics infrastructure

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use super::config::MetricsConfig;

/// Install the Prometheus recorder and its scrape listener
///
/// Returns whether a recorder was installed. Without one, every `metrics`
/// macro in the crate is a no-op.
pub fn init_metrics(config: &MetricsConfig) -> bool {
    if !config.enabled {
        tracing::debug!("Prometheus metrics disabled");
        return false;
    }

    let builder = PrometheusBuilder::new().with_http_listener(config.listen_address);

    match builder.install() {
        Ok(()) => {
            gauge!("ragchain_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics listening on {}", config.listen_address);
            true
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            false
        }
    }
}

/// Record one call to an LLM provider
pub fn record_llm_request(params: LlmRequestMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("model", params.model.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!("ragchain_llm_requests_total", &labels).increment(1);
    histogram!("ragchain_llm_request_duration_seconds", &labels)
        .record(params.duration.as_secs_f64());

    if let Some(tokens) = params.input_tokens {
        counter!("ragchain_llm_input_tokens_total", &labels).increment(tokens);
    }

    if let Some(tokens) = params.output_tokens {
        counter!("ragchain_llm_output_tokens_total", &labels).increment(tokens);
    }
}

/// Parameters for LLM request metrics
pub struct LlmRequestMetricParams<'a> {
    pub provider: &'a str,
    pub model: &'a str,
    pub duration: Duration,
    pub success: bool,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}
