// SPDX-License-Identifier: Apache-2.0

//! Retry executor: the attempt loop.
//!
//! Runs an operation, classifies each failure, sleeps for the computed
//! backoff, and tries again up to the policy's attempt bound. At most one
//! attempt is in flight at a time. Both suspension points (the operation and
//! the backoff sleep) are cancellable.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backoff;
use crate::error::TerminalError;
use crate::failure::{ErrorKind, Failure, classify};
use crate::policy::RetryPolicy;

/// Outcome of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Failure {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Failure message.
        message: String,
    },
}

/// Record of one execution of the operation within a retry loop.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// When the attempt started.
    pub timestamp: DateTime<Utc>,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// Backoff slept before this attempt (zero for the first).
    pub delay_before: Duration,
    /// Backoff that will be slept after this attempt, if it is retried.
    pub delay_after: Option<Duration>,
}

/// Successful result of a retry loop.
#[derive(Debug, Clone)]
pub struct Execution<T> {
    /// Value returned by the successful attempt.
    pub value: T,
    /// Number of attempts performed, including the successful one.
    pub attempts_used: u32,
    /// True if more than one attempt was needed.
    pub was_retried: bool,
    /// Every attempt in order.
    pub history: Vec<Attempt>,
}

/// Drives an operation through the retry loop for a fixed policy.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy this executor applies.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executes `operation` with retries.
    ///
    /// `operation` receives the 1-based attempt number. `on_attempt` is
    /// called after each failed attempt that will be retried, before the
    /// backoff sleep, in attempt order. It only observes; it must not panic.
    ///
    /// # Errors
    ///
    /// Returns a [`TerminalError`] carrying the last observed failure when a
    /// failure is not retryable or the attempt bound is reached, and a
    /// `Cancelled` terminal error when `cancel` fires.
    #[instrument(skip_all, fields(max_attempts = self.policy.max_attempts))]
    pub async fn execute<T, F, Fut, N>(
        &self,
        mut operation: F,
        mut on_attempt: N,
        cancel: &CancellationToken,
    ) -> Result<Execution<T>, TerminalError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
        N: FnMut(&Attempt),
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut history = Vec::new();
        let mut delay_before = Duration::ZERO;
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                debug!(attempt, "Retry loop cancelled before attempt");
                return Err(TerminalError::cancelled(attempt - 1));
            }

            debug!(attempt, max_attempts, "Starting attempt");
            let timestamp = Utc::now();

            let failure = match operation(attempt).await {
                Ok(value) => {
                    history.push(Attempt {
                        number: attempt,
                        timestamp,
                        outcome: AttemptOutcome::Success,
                        delay_before,
                        delay_after: None,
                    });
                    if attempt > 1 {
                        info!(attempts_used = attempt, "Operation succeeded after retry");
                    }
                    return Ok(Execution {
                        value,
                        attempts_used: attempt,
                        was_retried: attempt > 1,
                        history,
                    });
                }
                Err(failure) => failure,
            };

            let classification = classify(&failure, attempt);
            if !classification.retryable || attempt >= max_attempts {
                debug!(
                    attempt,
                    kind = classification.kind.label(),
                    retryable = classification.retryable,
                    "Attempt failed terminally"
                );
                return Err(TerminalError::new(classification.kind, attempt, failure));
            }

            let delay = backoff::delay(
                attempt,
                &self.policy,
                &classification.kind,
                classification.kind.retry_after(),
            );

            let record = Attempt {
                number: attempt,
                timestamp,
                outcome: AttemptOutcome::Failure {
                    kind: classification.kind.clone(),
                    message: failure.to_string(),
                },
                delay_before,
                delay_after: Some(delay),
            };
            on_attempt(&record);
            history.push(record);

            #[allow(clippy::cast_possible_truncation)]
            let delay_ms = delay.as_millis() as u64;
            warn!(
                attempt,
                max_attempts,
                kind = classification.kind.label(),
                delay_ms,
                error = %failure,
                "Retrying after error"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(attempt, "Retry loop cancelled during backoff");
                    return Err(TerminalError::cancelled(attempt));
                }
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
            delay_before = delay;
        }
    }
}
