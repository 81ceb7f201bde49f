// SPDX-License-Identifier: Apache-2.0

//! Error types for the Wayfare core.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Only [`ValidationError`] and [`TerminalError`] describe search failures;
//! classification and backoff decisions never leave the crate.

use thiserror::Error;

use crate::failure::{ErrorKind, Failure};

/// Errors that can occur during Wayfare operations.
#[derive(Error, Debug)]
pub enum WayfareError {
    /// Search input was rejected locally before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration file or environment error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Response body was not valid JSON.
    #[error("Invalid JSON response from search backend")]
    InvalidResponse(#[source] serde_json::Error),

    /// Response body was JSON but not a flight list.
    #[error("Unexpected response payload: {message}")]
    UnexpectedPayload {
        /// What was wrong with the payload.
        message: String,
    },

    /// Failed to build the HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The orchestrator task is gone (all handles outlived it).
    #[error("Search orchestrator is no longer running")]
    OrchestratorClosed,
}

impl From<config::ConfigError> for WayfareError {
    fn from(err: config::ConfigError) -> Self {
        WayfareError::Config {
            message: err.to_string(),
        }
    }
}

/// Local precondition failures for starting a search.
///
/// These are reported synchronously and never counted as attempts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Origin airport code is empty.
    #[error("Origin airport is required")]
    MissingOrigin,

    /// Destination airport code is empty.
    #[error("Destination airport is required")]
    MissingDestination,

    /// Travel date is not a valid `YYYY-MM-DD` date.
    #[error("Invalid travel date '{date}', expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input.
        date: String,
    },

    /// Passenger count is zero.
    #[error("At least one passenger is required")]
    NoPassengers,

    /// The device is offline.
    #[error("You appear to be offline")]
    Offline,
}

/// A failure that ended the retry loop with no further attempts.
///
/// Carries the classification of the last observed failure and how many
/// attempts were made. The last failure itself is the error source.
#[derive(Error, Debug, Clone)]
#[error("{last_message} (after {attempts_used} attempt(s))")]
pub struct TerminalError {
    /// Classification of the last failure.
    pub kind: ErrorKind,
    /// Number of attempts performed, including the last one.
    pub attempts_used: u32,
    /// Human-readable message of the last failure.
    pub last_message: String,
    /// The last observed failure.
    #[source]
    pub failure: Failure,
}

impl TerminalError {
    /// Builds a terminal error from the last failure and its classification.
    #[must_use]
    pub fn new(kind: ErrorKind, attempts_used: u32, failure: Failure) -> Self {
        Self {
            kind,
            attempts_used,
            last_message: failure.to_string(),
            failure,
        }
    }

    /// Builds a terminal error for a loop aborted by its caller.
    #[must_use]
    pub fn cancelled(attempts_used: u32) -> Self {
        Self::new(ErrorKind::Cancelled, attempts_used, Failure::Cancelled)
    }

    /// Returns true if the loop was aborted by its caller.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }
}
