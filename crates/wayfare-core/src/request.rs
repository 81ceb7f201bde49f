// SPDX-License-Identifier: Apache-2.0

//! Cancellable request wrapper.
//!
//! Wraps exactly one transport call with a per-call timeout and an external
//! cancellation signal. Whichever of completion, timeout, or cancellation
//! happens first decides the outcome; the others are dropped with it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::failure::Failure;

/// A request to a backend endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Endpoint URL.
    pub endpoint: String,
    /// JSON payload.
    pub payload: Value,
}

/// A raw response from the transport, before status interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl RawResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues network requests on behalf of the core.
///
/// Implementations normalize their own errors into [`Failure`] and should
/// stop work promptly once `signal` is cancelled.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request.
    async fn perform_request(
        &self,
        request: &Request,
        signal: CancellationToken,
        timeout: Duration,
    ) -> Result<RawResponse, Failure>;
}

/// Performs one transport call bounded by `timeout` and `external`.
///
/// Returns the response for 2xx statuses. Non-success statuses become
/// [`Failure::Status`], an elapsed timer becomes [`Failure::Deadline`], and
/// external cancellation becomes [`Failure::Cancelled`].
///
/// # Errors
///
/// Returns the normalized [`Failure`] of the call.
pub async fn call(
    transport: &dyn Transport,
    request: &Request,
    timeout: Duration,
    external: &CancellationToken,
) -> Result<RawResponse, Failure> {
    let signal = external.child_token();
    // Released on every exit path; aborts the transport if it is still running.
    let _abort = signal.clone().drop_guard();

    let response = tokio::select! {
        biased;
        () = external.cancelled() => {
            debug!(endpoint = %request.endpoint, "Request cancelled by caller");
            return Err(Failure::Cancelled);
        }
        () = tokio::time::sleep(timeout) => {
            #[allow(clippy::cast_possible_truncation)]
            let timeout_ms = timeout.as_millis() as u64;
            debug!(endpoint = %request.endpoint, timeout_ms, "Request timed out");
            return Err(Failure::Deadline { after: timeout });
        }
        result = transport.perform_request(request, signal.clone(), timeout) => result?,
    };

    if response.is_success() {
        Ok(response)
    } else {
        Err(Failure::from_response(
            response.status,
            &response.headers,
            &response.body,
        ))
    }
}
