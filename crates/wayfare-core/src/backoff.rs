// SPDX-License-Identifier: Apache-2.0

//! Exponential backoff with jitter.
//!
//! The pre-jitter component is `base_delay * 2^(attempt-1)`, scaled by 1.5
//! for server errors and capped at `max_delay`. Rate-limited failures raise
//! it to the server's `Retry-After` hint. Jitter of up to 50% is then added
//! and the result is clamped to `[0, max_delay]`.

use std::time::Duration;

use crate::failure::ErrorKind;
use crate::policy::RetryPolicy;

/// Extra factor applied to server errors to back off overloaded servers.
pub const SERVER_ERROR_MULTIPLIER: f64 = 1.5;

/// Upper bound of the jitter fraction.
pub const MAX_JITTER_FRACTION: f64 = 0.5;

// Past this exponent the cap always wins; keeps the float finite.
const MAX_EXPONENT: u32 = 1000;

/// Computes the delay before the attempt following `attempt`, without jitter.
///
/// `retry_after` is honored only when `kind` is [`ErrorKind::RateLimited`].
/// The result may exceed `max_delay` only when the hint does.
#[must_use]
pub fn base_component(
    attempt: u32,
    policy: &RetryPolicy,
    kind: &ErrorKind,
    retry_after: Option<Duration>,
) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    #[allow(clippy::cast_possible_wrap)]
    let mut secs = policy.base_delay.as_secs_f64() * 2f64.powi(exponent as i32);

    if matches!(kind, ErrorKind::ServerError) {
        secs *= SERVER_ERROR_MULTIPLIER;
    }

    let capped = Duration::from_secs_f64(secs.min(policy.max_delay.as_secs_f64()));

    match (kind, retry_after) {
        (ErrorKind::RateLimited { .. }, Some(hint)) => capped.max(hint),
        _ => capped,
    }
}

/// Computes the delay with an explicit jitter fraction in `[0, 0.5]`.
///
/// Values outside that range are clamped.
#[must_use]
pub fn delay_with_jitter(
    attempt: u32,
    policy: &RetryPolicy,
    kind: &ErrorKind,
    retry_after: Option<Duration>,
    jitter: f64,
) -> Duration {
    let base = base_component(attempt, policy, kind, retry_after);
    let fraction = if jitter.is_finite() {
        jitter.clamp(0.0, MAX_JITTER_FRACTION)
    } else {
        0.0
    };
    base.saturating_add(base.mul_f64(fraction))
        .min(policy.max_delay)
}

/// Computes the delay before the next attempt with random jitter.
#[must_use]
pub fn delay(
    attempt: u32,
    policy: &RetryPolicy,
    kind: &ErrorKind,
    retry_after: Option<Duration>,
) -> Duration {
    let jitter = fastrand::f64() * MAX_JITTER_FRACTION;
    delay_with_jitter(attempt, policy, kind, retry_after, jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[test]
    fn test_exponential_growth() {
        let p = policy();
        let kind = ErrorKind::NetworkError;
        assert_eq!(base_component(1, &p, &kind, None), Duration::from_secs(1));
        assert_eq!(base_component(2, &p, &kind, None), Duration::from_secs(2));
        assert_eq!(base_component(3, &p, &kind, None), Duration::from_secs(4));
        assert_eq!(base_component(4, &p, &kind, None), Duration::from_secs(8));
    }

    #[test]
    fn test_capped_at_max_delay() {
        let p = policy();
        let kind = ErrorKind::Timeout;
        assert_eq!(base_component(10, &p, &kind, None), Duration::from_secs(30));
        assert_eq!(
            base_component(u32::MAX, &p, &kind, None),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_server_error_backs_off_harder() {
        let p = policy();
        assert_eq!(
            base_component(1, &p, &ErrorKind::ServerError, None),
            Duration::from_millis(1500)
        );
        assert_eq!(
            base_component(2, &p, &ErrorKind::ServerError, None),
            Duration::from_secs(3)
        );
        // 16s * 1.5 = 24s stays under the cap, 32s * 1.5 does not.
        assert_eq!(
            base_component(5, &p, &ErrorKind::ServerError, None),
            Duration::from_secs(24)
        );
        assert_eq!(
            base_component(6, &p, &ErrorKind::ServerError, None),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_retry_after_raises_rate_limited_delay() {
        let p = policy();
        let hint = Some(Duration::from_secs(5));
        let kind = ErrorKind::RateLimited { retry_after: hint };
        assert!(base_component(1, &p, &kind, hint) >= Duration::from_millis(5000));
        // A hint shorter than the computed delay does not lower it.
        assert_eq!(base_component(4, &p, &kind, hint), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_after_ignored_for_other_kinds() {
        let p = policy();
        let hint = Some(Duration::from_secs(20));
        assert_eq!(
            base_component(1, &p, &ErrorKind::NetworkError, hint),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let p = policy();
        let kind = ErrorKind::NetworkError;
        assert_eq!(
            delay_with_jitter(2, &p, &kind, None, 0.0),
            Duration::from_secs(2)
        );
        assert_eq!(
            delay_with_jitter(2, &p, &kind, None, 0.5),
            Duration::from_secs(3)
        );
        // Out-of-range fractions are clamped.
        assert_eq!(
            delay_with_jitter(2, &p, &kind, None, 4.0),
            Duration::from_secs(3)
        );
        assert_eq!(
            delay_with_jitter(2, &p, &kind, None, f64::NAN),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_delay_never_exceeds_max() {
        let p = policy();
        let kinds = [
            ErrorKind::ServerError,
            ErrorKind::NetworkError,
            ErrorKind::Timeout,
            ErrorKind::RateLimited {
                retry_after: Some(Duration::from_secs(120)),
            },
        ];
        for kind in &kinds {
            for attempt in 1..=40 {
                let d = delay(attempt, &p, kind, kind.retry_after());
                assert!(d <= p.max_delay, "attempt {attempt} {kind:?} gave {d:?}");
            }
        }
    }

    #[test]
    fn test_base_component_is_monotonic() {
        let p = RetryPolicy::new(10, Duration::from_millis(250), Duration::from_secs(30))
            .expect("valid policy");
        for kind in [ErrorKind::ServerError, ErrorKind::NetworkError] {
            let mut previous = Duration::ZERO;
            for attempt in 1..=20 {
                let current = base_component(attempt, &p, &kind, None);
                assert!(current >= previous);
                previous = current;
            }
        }
    }

    #[test]
    fn test_zero_base_delay() {
        let p = RetryPolicy::new(5, Duration::ZERO, Duration::from_secs(30)).expect("valid policy");
        assert_eq!(
            base_component(u32::MAX, &p, &ErrorKind::ServerError, None),
            Duration::ZERO
        );
    }
}
