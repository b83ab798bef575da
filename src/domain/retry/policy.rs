//! Fixed and exponential backoff policies
//!
//! A policy is a pure function from `(attempt, error)` to either a delay before
//! the next attempt or a give-up decision. It never holds mutable state, so a
//! single policy value can be shared by any number of call sites.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Unit in which `base_delay` is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    fn millis(&self) -> f64 {
        match self {
            Self::Milliseconds => 1.0,
            Self::Seconds => 1_000.0,
            Self::Minutes => 60_000.0,
        }
    }
}

/// Shape of the delay curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffKind {
    /// Same delay before every retry
    Fixed,
    /// `base_delay * multiplier^(attempt - 1)`
    Exponential { multiplier: f64 },
}

/// Immutable retry policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RetryPolicySettings", into = "RetryPolicySettings")]
pub struct RetryPolicy {
    kind: BackoffKind,
    base_delay: u64,
    max_attempts: u32,
    unit: TimeUnit,
}

impl RetryPolicy {
    /// Constant delay between attempts
    pub fn fixed(base_delay: u64, max_attempts: u32, unit: TimeUnit) -> Result<Self, DomainError> {
        Self::build(BackoffKind::Fixed, base_delay, max_attempts, unit)
    }

    /// Delay growing by `multiplier` after every failed attempt
    pub fn exponential(
        base_delay: u64,
        multiplier: f64,
        max_attempts: u32,
        unit: TimeUnit,
    ) -> Result<Self, DomainError> {
        Self::build(
            BackoffKind::Exponential { multiplier },
            base_delay,
            max_attempts,
            unit,
        )
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            kind: BackoffKind::Fixed,
            base_delay: 0,
            max_attempts: 1,
            unit: TimeUnit::Milliseconds,
        }
    }

    fn build(
        kind: BackoffKind,
        base_delay: u64,
        max_attempts: u32,
        unit: TimeUnit,
    ) -> Result<Self, DomainError> {
        if max_attempts < 1 {
            return Err(DomainError::validation(
                "Retry policy needs at least one attempt",
            ));
        }

        if let BackoffKind::Exponential { multiplier } = kind {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(DomainError::validation(format!(
                    "Backoff multiplier must be a finite value >= 1.0, got {}",
                    multiplier
                )));
            }
        }

        Ok(Self {
            kind,
            base_delay,
            max_attempts,
            unit,
        })
    }

    pub fn kind(&self) -> BackoffKind {
        self.kind
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.delay_for_attempt(1)
    }

    /// Decide whether to retry after `attempt` failed attempts (1-based)
    pub fn next_delay(&self, attempt: u32, error: &DomainError) -> Option<Duration> {
        if attempt >= self.max_attempts || !error.is_retryable() {
            return None;
        }

        Some(self.delay_for_attempt(attempt))
    }

    /// Raw delay curve, ignoring the attempt limit
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay as f64 * self.unit.millis();

        let delay_ms = match self.kind {
            BackoffKind::Fixed => base_ms,
            BackoffKind::Exponential { multiplier } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                base_ms * multiplier.powi(exponent)
            }
        };

        let nanos = delay_ms * 1_000_000.0;

        if nanos >= u64::MAX as f64 {
            Duration::from_nanos(u64::MAX)
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            kind: BackoffKind::Exponential { multiplier: 2.0 },
            base_delay: 500,
            max_attempts: 3,
            unit: TimeUnit::Milliseconds,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PolicyKindSetting {
    Fixed,
    Exponential,
}

/// Serialized form of a policy, validated on the way in
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetryPolicySettings {
    kind: PolicyKindSetting,
    base_delay: u64,
    #[serde(default = "default_multiplier")]
    multiplier: f64,
    max_attempts: u32,
    #[serde(default)]
    unit: TimeUnit,
}

fn default_multiplier() -> f64 {
    2.0
}

impl TryFrom<RetryPolicySettings> for RetryPolicy {
    type Error = DomainError;

    fn try_from(settings: RetryPolicySettings) -> Result<Self, Self::Error> {
        let kind = match settings.kind {
            PolicyKindSetting::Fixed => BackoffKind::Fixed,
            PolicyKindSetting::Exponential => BackoffKind::Exponential {
                multiplier: settings.multiplier,
            },
        };

        Self::build(kind, settings.base_delay, settings.max_attempts, settings.unit)
    }
}

impl From<RetryPolicy> for RetryPolicySettings {
    fn from(policy: RetryPolicy) -> Self {
        let (kind, multiplier) = match policy.kind {
            BackoffKind::Fixed => (PolicyKindSetting::Fixed, 1.0),
            BackoffKind::Exponential { multiplier } => {
                (PolicyKindSetting::Exponential, multiplier)
            }
        };

        Self {
            kind,
            base_delay: policy.base_delay,
            multiplier,
            max_attempts: policy.max_attempts,
            unit: policy.unit,
        }
    }
}
