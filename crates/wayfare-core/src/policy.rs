// SPDX-License-Identifier: Apache-2.0

//! Retry policy configuration value.

use std::time::Duration;

use crate::error::WayfareError;

/// Immutable retry configuration supplied once per executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::Config` if `max_attempts` is zero or
    /// `base_delay` exceeds `max_delay`.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, WayfareError> {
        if max_attempts == 0 {
            return Err(WayfareError::Config {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        if base_delay > max_delay {
            return Err(WayfareError::Config {
                message: format!(
                    "retry.base_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
                    base_delay.as_millis(),
                    max_delay.as_millis()
                ),
            });
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
        })
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}
