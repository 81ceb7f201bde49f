// SPDX-License-Identifier: Apache-2.0

//! HTTP transport backed by `reqwest`.
//!
//! Posts the request payload as JSON and normalizes `reqwest` errors into the
//! fixed [`Failure`] shape before they reach the classifier.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::WayfareError;
use crate::failure::{Failure, TransportCode};
use crate::request::{RawResponse, Request, Transport};

/// [`Transport`] that talks HTTP with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::Http` if the client cannot be built.
    pub fn new() -> Result<Self, WayfareError> {
        let client = Client::builder()
            .user_agent(concat!("wayfare/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a transport around an existing client (reuse for connection pooling).
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(endpoint = %request.endpoint))]
    async fn perform_request(
        &self,
        request: &Request,
        signal: CancellationToken,
        timeout: Duration,
    ) -> Result<RawResponse, Failure> {
        let exchange = async {
            let response = self
                .client
                .post(&request.endpoint)
                .timeout(timeout)
                .json(&request.payload)
                .send()
                .await
                .map_err(|e| normalize_error(&e))?;

            let status = response.status().as_u16();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let body = response.text().await.map_err(|e| normalize_error(&e))?;

            debug!(status, body_length = body.len(), "Received response");
            Ok(RawResponse {
                status,
                headers,
                body,
            })
        };

        tokio::select! {
            biased;
            () = signal.cancelled() => Err(Failure::Cancelled),
            result = exchange => result,
        }
    }
}

/// Maps a `reqwest` error onto the normalized failure shape.
#[must_use]
pub fn normalize_error(err: &reqwest::Error) -> Failure {
    if err.is_timeout() {
        return Failure::Transport {
            code: TransportCode::TimedOut,
        };
    }
    if err.is_connect() {
        return Failure::Transport {
            code: TransportCode::ConnectionRefused,
        };
    }
    if let Some(status) = err.status() {
        return Failure::Status {
            status: status.as_u16(),
            retry_after: None,
            message: err.to_string(),
        };
    }
    if err.is_body() || err.is_request() {
        return Failure::Transport {
            code: TransportCode::ConnectionAborted,
        };
    }
    if err.is_decode() {
        return Failure::Other {
            message: err.to_string(),
        };
    }
    Failure::Transport {
        code: TransportCode::Other(err.to_string()),
    }
}
