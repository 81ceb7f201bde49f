// SPDX-License-Identifier: Apache-2.0

//! CLI-specific error formatting with user-friendly hints.
//!
//! Downcasts `anyhow::Error` to the core error types and adds a tip for
//! each failure cause. The core carries structured data; presentation lives
//! here.

use std::fmt::{self, Write};

use anyhow::Error;
use wayfare_core::{FailureCause, SearchFailure, ValidationError, WayfareError};

/// A search that settled in the error state.
#[derive(Debug)]
pub struct SearchFailed(pub SearchFailure);

impl fmt::Display for SearchFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Search failed: {}", self.0.message)
    }
}

impl std::error::Error for SearchFailed {}

/// Formats an error for CLI display with helpful hints.
///
/// If the error is not a known core error, returns the original message.
pub fn format_error(error: &Error) -> String {
    if let Some(SearchFailed(failure)) = error.downcast_ref::<SearchFailed>() {
        return format_search_failure(failure);
    }

    if let Some(wayfare_err) = error.downcast_ref::<WayfareError>() {
        return match wayfare_err {
            WayfareError::Validation(ValidationError::InvalidDate { .. }) => {
                format!("{wayfare_err}\n\nTip: Use a date like 2024-12-01.")
            }
            WayfareError::Validation(ValidationError::Offline) => {
                format!("{wayfare_err}\n\nTip: Check your internet connection and try again.")
            }
            WayfareError::Config { .. } => match wayfare_core::config_file_path() {
                Ok(path) => format!(
                    "{wayfare_err}\n\nTip: Check your config file at {}",
                    path.display()
                ),
                Err(_) => wayfare_err.to_string(),
            },
            _ => wayfare_err.to_string(),
        };
    }

    error.to_string()
}

fn format_search_failure(failure: &SearchFailure) -> String {
    let mut msg = failure.message.clone();
    if failure.exhausted {
        let _ = write!(msg, " (gave up after {} attempts)", failure.attempts_used);
    }

    let tip = match &failure.cause {
        FailureCause::Offline => "You appear to be offline. Reconnect and search again.".to_string(),
        FailureCause::Timeout => {
            "The flight service is slow to respond. Try again, or raise request.per_call_timeout_ms."
                .to_string()
        }
        FailureCause::RateLimited {
            retry_after_secs: Some(secs),
        } => format!("Too many searches. Wait at least {secs} seconds before retrying."),
        FailureCause::RateLimited {
            retry_after_secs: None,
        } => "Too many searches. Wait a moment before retrying.".to_string(),
        FailureCause::ServerBusy => {
            "The flight service is having trouble. Try again in a moment.".to_string()
        }
        FailureCause::Network => {
            "Could not reach the flight service. Check the endpoint with --endpoint or search.endpoint."
                .to_string()
        }
        FailureCause::Client { status: 404, .. } => {
            "The search endpoint was not found. Check search.endpoint in your config.".to_string()
        }
        FailureCause::Client { status: 401 | 403, .. } => {
            "The flight service rejected the request as unauthorized.".to_string()
        }
        FailureCause::Client { .. } => {
            "The flight service rejected the search. Check the airports and date.".to_string()
        }
        FailureCause::Cancelled => "The search was cancelled.".to_string(),
        FailureCause::Unknown => {
            "The flight service returned something unexpected. Run with -v for details."
                .to_string()
        }
    };

    let _ = write!(msg, "\n\nTip: {tip}");
    msg
}
