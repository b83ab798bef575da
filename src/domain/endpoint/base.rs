//! Retry loop shared by every endpoint

use std::future::Future;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::domain::retry::RetryPolicy;
use crate::domain::DomainError;

/// Identity of a remote capability plus the retry policy bound to it
#[derive(Debug, Clone)]
pub struct Endpoint {
    name: String,
    url: Option<String>,
    policy: RetryPolicy,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            url: None,
            policy,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds or the policy gives up
    ///
    /// Every attempt calls `op` afresh. A non-retryable error is returned as
    /// is; a retryable one the policy refuses to retry again is wrapped in
    /// `RetryExhausted` together with the attempt count.
    pub async fn call<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let start = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            let result = op().await;

            let error = match result {
                Ok(value) => {
                    self.record_outcome(operation, "success", attempt, start);
                    return Ok(value);
                }
                Err(error) => error,
            };

            match self.policy.next_delay(attempt, &error) {
                Some(delay) => {
                    debug!(
                        endpoint = %self.name,
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying endpoint call"
                    );
                    counter!(
                        "ragchain_endpoint_retries_total",
                        "endpoint" => self.name.clone(),
                        "operation" => operation
                    )
                    .increment(1);

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None if error.is_retryable() => {
                    warn!(
                        endpoint = %self.name,
                        operation,
                        attempts = attempt,
                        error = %error,
                        "Retry policy gave up"
                    );
                    self.record_outcome(operation, "exhausted", attempt, start);
                    return Err(DomainError::retry_exhausted(attempt, error));
                }
                None => {
                    warn!(
                        endpoint = %self.name,
                        operation,
                        error = %error,
                        "Endpoint call failed with a non-retryable error"
                    );
                    self.record_outcome(operation, error.kind(), attempt, start);
                    return Err(error);
                }
            }
        }
    }

    fn record_outcome(&self, operation: &'static str, outcome: &'static str, attempts: u32, start: Instant) {
        let labels = [
            ("endpoint", self.name.clone()),
            ("operation", operation.to_string()),
            ("outcome", outcome.to_string()),
        ];

        counter!("ragchain_endpoint_calls_total", &labels).increment(1);
        histogram!("ragchain_endpoint_attempts", &labels).record(attempts as f64);
        histogram!("ragchain_endpoint_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());
    }
}
