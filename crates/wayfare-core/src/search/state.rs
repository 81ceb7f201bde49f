// SPDX-License-Identifier: Apache-2.0

//! Read-only projections of the search lifecycle.

use serde::Serialize;

use crate::error::TerminalError;
use crate::failure::ErrorKind;
use crate::search::results::SearchResults;

/// Lifecycle state of the current search, as seen by the UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    /// No search has been started, or the last one was cancelled or dismissed.
    #[default]
    Idle,
    /// The first attempt is in flight.
    Searching,
    /// A retry is pending or in flight.
    Retrying {
        /// The attempt being made (2 or more).
        attempt: u32,
        /// The attempt bound.
        max_attempts: u32,
    },
    /// The search completed.
    Success(SearchResults),
    /// The search ended without results.
    Error(SearchFailure),
}

impl SearchState {
    /// Returns true while a retry loop is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, SearchState::Searching | SearchState::Retrying { .. })
    }

    /// Returns true for `Success` and `Error`.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, SearchState::Success(_) | SearchState::Error(_))
    }
}

/// Why a search failed, in terms the UI can offer a recovery action for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// The device lost connectivity.
    Offline,
    /// A per-call or overall deadline expired.
    Timeout,
    /// The backend asked us to slow down.
    RateLimited {
        /// Server hint in seconds, if any.
        retry_after_secs: Option<u64>,
    },
    /// The backend answered with server errors.
    ServerBusy,
    /// The connection failed while the device reported being online.
    Network,
    /// The backend rejected the request.
    Client {
        /// HTTP status.
        status: u16,
        /// Whether the status was treated as transient.
        retryable: bool,
    },
    /// The search was aborted.
    Cancelled,
    /// Unclassified failure.
    Unknown,
}

impl FailureCause {
    /// Maps a classification onto a user-facing cause.
    #[must_use]
    pub fn from_kind(kind: &ErrorKind, online: bool) -> Self {
        match kind {
            ErrorKind::NetworkError if !online => FailureCause::Offline,
            ErrorKind::NetworkError => FailureCause::Network,
            ErrorKind::Timeout => FailureCause::Timeout,
            ErrorKind::RateLimited { retry_after } => FailureCause::RateLimited {
                retry_after_secs: retry_after.map(|d| d.as_secs()),
            },
            ErrorKind::ServerError => FailureCause::ServerBusy,
            ErrorKind::ClientError { retryable, status } => FailureCause::Client {
                status: *status,
                retryable: *retryable,
            },
            ErrorKind::Cancelled => FailureCause::Cancelled,
            ErrorKind::Unknown => FailureCause::Unknown,
        }
    }

    /// Returns true if repeating the same search could help.
    #[must_use]
    pub fn allows_retry(&self) -> bool {
        match self {
            FailureCause::Client { retryable, .. } => *retryable,
            FailureCause::Unknown => false,
            _ => true,
        }
    }
}

/// Terminal failure of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFailure {
    /// Last failure message.
    pub message: String,
    /// Attempts made before giving up.
    pub attempts_used: u32,
    /// True if the loop stopped because it ran out of attempts.
    pub exhausted: bool,
    /// User-facing cause.
    pub cause: FailureCause,
}

impl SearchFailure {
    /// Builds a failure from a terminal retry error.
    #[must_use]
    pub fn from_terminal(err: &TerminalError, max_attempts: u32, online: bool) -> Self {
        let retryable = !matches!(
            err.kind,
            ErrorKind::Cancelled
                | ErrorKind::Unknown
                | ErrorKind::ClientError {
                    retryable: false,
                    ..
                }
        );
        Self {
            message: err.last_message.clone(),
            attempts_used: err.attempts_used,
            exhausted: retryable && err.attempts_used >= max_attempts,
            cause: FailureCause::from_kind(&err.kind, online),
        }
    }

    /// Builds the failure reported when the overall deadline expires.
    #[must_use]
    pub fn outer_timeout(attempts_used: u32, limit_ms: u64) -> Self {
        Self {
            message: format!("Search timed out after {limit_ms}ms"),
            attempts_used,
            exhausted: false,
            cause: FailureCause::Timeout,
        }
    }

    /// Returns true if a manual retry is allowed.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.cause.allows_retry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;
    use std::time::Duration;

    fn terminal(kind: ErrorKind, attempts: u32) -> TerminalError {
        TerminalError::new(
            kind,
            attempts,
            Failure::Other {
                message: "last".to_string(),
            },
        )
    }

    #[test]
    fn test_network_error_while_offline_is_offline() {
        assert_eq!(
            FailureCause::from_kind(&ErrorKind::NetworkError, false),
            FailureCause::Offline
        );
        assert_eq!(
            FailureCause::from_kind(&ErrorKind::NetworkError, true),
            FailureCause::Network
        );
    }

    #[test]
    fn test_rate_limited_hint_in_seconds() {
        let cause = FailureCause::from_kind(
            &ErrorKind::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
            },
            true,
        );
        assert_eq!(
            cause,
            FailureCause::RateLimited {
                retry_after_secs: Some(5)
            }
        );
    }

    #[test]
    fn test_exhausted_only_for_retryable_kinds() {
        let exhausted = SearchFailure::from_terminal(&terminal(ErrorKind::ServerError, 3), 3, true);
        assert!(exhausted.exhausted);
        assert_eq!(exhausted.cause, FailureCause::ServerBusy);
        assert!(exhausted.can_retry());

        let rejected = SearchFailure::from_terminal(
            &terminal(
                ErrorKind::ClientError {
                    retryable: false,
                    status: 401,
                },
                1,
            ),
            3,
            true,
        );
        assert!(!rejected.exhausted);
        assert!(!rejected.can_retry());
    }

    #[test]
    fn test_state_predicates() {
        assert!(SearchState::Searching.is_active());
        assert!(
            SearchState::Retrying {
                attempt: 2,
                max_attempts: 3
            }
            .is_active()
        );
        assert!(!SearchState::Idle.is_active());
        assert!(!SearchState::Idle.is_settled());
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let json = serde_json::to_value(SearchState::Retrying {
            attempt: 2,
            max_attempts: 3,
        })
        .expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({"state": "retrying", "attempt": 2, "max_attempts": 3})
        );
    }
}
