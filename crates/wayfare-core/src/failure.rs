// SPDX-License-Identifier: Apache-2.0

//! Failure normalization and classification.
//!
//! Transport libraries report errors in different shapes. They are normalized
//! at the boundary into [`Failure`], and [`classify`] maps a failure onto the
//! fixed [`ErrorKind`] taxonomy together with a retry decision.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Maximum retry-after delay to prevent excessive waits (120 seconds).
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Connection-level cause of a failure that produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCode {
    /// The transport gave up waiting (socket or client timeout).
    TimedOut,
    /// The connection was aborted mid-request.
    ConnectionAborted,
    /// The connection could not be established.
    ConnectionRefused,
    /// The peer reset the connection.
    ConnectionReset,
    /// The request was sent but no response object came back.
    NoResponse,
    /// Any other transport-level error (TLS, request construction, ...).
    Other(String),
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportCode::TimedOut => f.write_str("timed out"),
            TransportCode::ConnectionAborted => f.write_str("connection aborted"),
            TransportCode::ConnectionRefused => f.write_str("connection refused"),
            TransportCode::ConnectionReset => f.write_str("connection reset"),
            TransportCode::NoResponse => f.write_str("no response"),
            TransportCode::Other(code) => f.write_str(code),
        }
    }
}

/// A captured failure of a single attempt, normalized from the transport.
#[derive(Error, Debug, Clone)]
pub enum Failure {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Parsed `Retry-After` hint, if the response carried one.
        retry_after: Option<Duration>,
        /// Response body or reason phrase.
        message: String,
    },

    /// No HTTP response: the connection failed or timed out at the transport.
    #[error("Network error: {code}")]
    Transport {
        /// Connection-level cause.
        code: TransportCode,
    },

    /// The per-call deadline fired before the call completed.
    #[error("Request timed out after {}ms", .after.as_millis())]
    Deadline {
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// The caller aborted the request.
    #[error("Request was cancelled")]
    Cancelled,

    /// Anything else (malformed payloads, unexpected client errors).
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl Failure {
    /// Builds a [`Failure::Status`] from a non-success response.
    ///
    /// `headers` must use lowercase names. The `Retry-After` header is parsed
    /// relative to the current time.
    #[must_use]
    pub fn from_response(status: u16, headers: &HashMap<String, String>, body: &str) -> Self {
        let retry_after = headers
            .get("retry-after")
            .and_then(|value| parse_retry_after(value, Utc::now()));
        let message = if body.trim().is_empty() {
            "no response body".to_string()
        } else {
            body.trim().to_string()
        };
        Failure::Status {
            status,
            retry_after,
            message,
        }
    }

    /// Returns the HTTP status carried by this failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Classification tag for a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// 4xx response. `retryable` is false for 400/401/403/404.
    ClientError {
        /// Whether the status is treated as possibly transient.
        retryable: bool,
        /// The HTTP status.
        status: u16,
    },
    /// 5xx response.
    ServerError,
    /// 429 response, with the server's `Retry-After` hint if present.
    RateLimited {
        /// Server-provided delay hint.
        retry_after: Option<Duration>,
    },
    /// No response: connection failed or was aborted.
    NetworkError,
    /// An explicit deadline fired.
    Timeout,
    /// The caller aborted the operation.
    Cancelled,
    /// Anything not covered above.
    Unknown,
}

impl ErrorKind {
    /// Returns the `Retry-After` hint for rate-limited failures.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-friendly label, used in structured logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::ClientError {
                retryable: true, ..
            } => "client_error_retryable",
            ErrorKind::ClientError { .. } => "client_error",
            ErrorKind::ServerError => "server_error",
            ErrorKind::RateLimited { .. } => "rate_limited",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Result of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Classification tag.
    pub kind: ErrorKind,
    /// Whether another attempt is worthwhile.
    pub retryable: bool,
    /// The attempt that produced the failure (reported for logging only).
    pub attempt: u32,
}

/// Classifies a failure and decides whether it should be retried.
///
/// Pure function of the failure; `attempt` does not affect eligibility.
#[must_use]
pub fn classify(failure: &Failure, attempt: u32) -> Classification {
    let (kind, retryable) = match failure {
        Failure::Status {
            status,
            retry_after,
            ..
        } => classify_status(*status, *retry_after),
        Failure::Transport { code } => match code {
            TransportCode::TimedOut => (ErrorKind::Timeout, true),
            TransportCode::ConnectionAborted
            | TransportCode::ConnectionRefused
            | TransportCode::ConnectionReset
            | TransportCode::NoResponse => (ErrorKind::NetworkError, true),
            TransportCode::Other(_) => (ErrorKind::Unknown, false),
        },
        Failure::Deadline { .. } => (ErrorKind::Timeout, true),
        Failure::Cancelled => (ErrorKind::Cancelled, false),
        Failure::Other { .. } => (ErrorKind::Unknown, false),
    };

    Classification {
        kind,
        retryable,
        attempt,
    }
}

fn classify_status(status: u16, retry_after: Option<Duration>) -> (ErrorKind, bool) {
    match status {
        429 => (ErrorKind::RateLimited { retry_after }, true),
        400 | 401 | 403 | 404 => (
            ErrorKind::ClientError {
                retryable: false,
                status,
            },
            false,
        ),
        // Other 4xx are treated as possibly-transient validation hiccups.
        402..=499 => (
            ErrorKind::ClientError {
                retryable: true,
                status,
            },
            true,
        ),
        500..=599 => (ErrorKind::ServerError, true),
        _ => (ErrorKind::Unknown, false),
    }
}

/// Parses a `Retry-After` header value.
///
/// Accepts delta-seconds (`"5"`) or an HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Caps the value at 120 seconds.
/// Returns `None` for unparseable, zero, or past values.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    let secs = if let Ok(secs) = value.parse::<u64>() {
        secs
    } else {
        let at = DateTime::parse_from_rfc2822(value).ok()?;
        let remaining = at.with_timezone(&Utc) - now;
        u64::try_from(remaining.num_seconds()).ok()?
    };

    if secs == 0 {
        return None;
    }
    Some(Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status(code: u16) -> Failure {
        Failure::Status {
            status: code,
            retry_after: None,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_always_non_retryable_client_statuses() {
        for code in [400, 401, 403, 404] {
            let c = classify(&status(code), 1);
            assert!(!c.retryable, "{code} must not be retried");
            assert_eq!(
                c.kind,
                ErrorKind::ClientError {
                    retryable: false,
                    status: code
                }
            );
        }
    }

    #[test]
    fn test_other_client_statuses_are_retryable() {
        for code in [402, 408, 409, 422] {
            let c = classify(&status(code), 2);
            assert!(c.retryable, "{code} should be retried");
            assert_eq!(
                c.kind,
                ErrorKind::ClientError {
                    retryable: true,
                    status: code
                }
            );
        }
    }

    #[test]
    fn test_rate_limited_carries_hint() {
        let failure = Failure::Status {
            status: 429,
            retry_after: Some(Duration::from_secs(5)),
            message: "slow down".to_string(),
        };
        let c = classify(&failure, 1);
        assert!(c.retryable);
        assert_eq!(c.kind.retry_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for code in [500, 502, 503, 504, 599] {
            let c = classify(&status(code), 1);
            assert!(c.retryable);
            assert_eq!(c.kind, ErrorKind::ServerError);
        }
    }

    #[test]
    fn test_non_error_status_is_unknown() {
        let c = classify(&status(302), 1);
        assert!(!c.retryable);
        assert_eq!(c.kind, ErrorKind::Unknown);
    }

    #[test]
    fn test_transport_failures() {
        let timed_out = classify(
            &Failure::Transport {
                code: TransportCode::TimedOut,
            },
            1,
        );
        assert_eq!(timed_out.kind, ErrorKind::Timeout);
        assert!(timed_out.retryable);

        let aborted = classify(
            &Failure::Transport {
                code: TransportCode::ConnectionAborted,
            },
            1,
        );
        assert_eq!(aborted.kind, ErrorKind::NetworkError);
        assert!(aborted.retryable);

        let no_response = classify(
            &Failure::Transport {
                code: TransportCode::NoResponse,
            },
            1,
        );
        assert_eq!(no_response.kind, ErrorKind::NetworkError);

        let tls = classify(
            &Failure::Transport {
                code: TransportCode::Other("tls handshake".to_string()),
            },
            1,
        );
        assert_eq!(tls.kind, ErrorKind::Unknown);
        assert!(!tls.retryable);
    }

    #[test]
    fn test_deadline_is_timeout() {
        let c = classify(
            &Failure::Deadline {
                after: Duration::from_secs(30),
            },
            3,
        );
        assert_eq!(c.kind, ErrorKind::Timeout);
        assert!(c.retryable);
        assert_eq!(c.attempt, 3);
    }

    #[test]
    fn test_cancelled_is_never_retryable() {
        let c = classify(&Failure::Cancelled, 1);
        assert_eq!(c.kind, ErrorKind::Cancelled);
        assert!(!c.retryable);
    }

    #[test]
    fn test_unknown_fails_closed() {
        let c = classify(
            &Failure::Other {
                message: "weird".to_string(),
            },
            1,
        );
        assert_eq!(c.kind, ErrorKind::Unknown);
        assert!(!c.retryable);
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = Utc::now();
        assert_eq!(parse_retry_after("5", now), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 30 ", now), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("0", now), None);
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_parse_retry_after_capped() {
        let now = Utc::now();
        assert_eq!(
            parse_retry_after("600", now),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 50).unwrap();
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(10))
        );
        // Dates in the past carry no useful hint.
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:20:00 GMT", now),
            None
        );
    }

    #[test]
    fn test_from_response_reads_lowercase_header() {
        let mut headers = HashMap::new();
        headers.insert("retry-after".to_string(), "7".to_string());
        let failure = Failure::from_response(429, &headers, "");
        match failure {
            Failure::Status {
                status,
                retry_after,
                message,
            } => {
                assert_eq!(status, 429);
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
                assert_eq!(message, "no response body");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }
}
