// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # Wayfare Core
//!
//! Resilient request execution for flight search.
//!
//! This crate provides reusable components for:
//! - Classifying failed backend calls into retryable and terminal kinds
//! - Computing backoff delays with jitter and `Retry-After` hints
//! - Running operations under a retry policy with cancellation
//! - Per-call timeouts over a pluggable HTTP transport
//! - A search state machine that survives offline periods
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wayfare_core::{
//!     HttpTransport, NetworkMonitor, SearchOptions, SearchOrchestrator, SearchParams, load_config,
//! };
//!
//! # async fn example() -> wayfare_core::Result<()> {
//! let config = load_config()?;
//! let handle = SearchOrchestrator::spawn(
//!     Arc::new(HttpTransport::new()?),
//!     Arc::new(NetworkMonitor::default()),
//!     SearchOptions::from_config(&config)?,
//! );
//!
//! let params = SearchParams::builder()
//!     .from("DEL")
//!     .to("BOM")
//!     .date("2024-12-01")
//!     .build();
//! handle.start_search(params).await?;
//! println!("{:?}", handle.wait_until_settled().await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`failure`] - Failure taxonomy and classification
//! - [`backoff`] - Delay computation
//! - [`executor`] - Retry loop
//! - [`request`] - Cancellable calls with timeouts
//! - [`search`] - Search parameters, results and orchestrator
//! - [`config`] - Configuration loading

// ============================================================================
// Error Handling
// ============================================================================

pub use error::{TerminalError, ValidationError, WayfareError};

/// Convenience Result type for Wayfare operations.
///
/// This is equivalent to `std::result::Result<T, WayfareError>`.
pub type Result<T> = std::result::Result<T, WayfareError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    AppConfig, RequestConfig, RetryConfig, SearchConfig, config_dir, config_file_path,
    load_config, load_config_from,
};

// ============================================================================
// Failure Classification
// ============================================================================

pub use failure::{Classification, ErrorKind, Failure, TransportCode, classify};

// ============================================================================
// Retry Logic
// ============================================================================

pub use executor::{Attempt, AttemptOutcome, Execution, RetryExecutor};
pub use policy::RetryPolicy;

// ============================================================================
// Requests
// ============================================================================

pub use network::{NetworkMonitor, NetworkStatus};
pub use request::{RawResponse, Request, Transport};
pub use transport::HttpTransport;

// ============================================================================
// Flight Search
// ============================================================================

pub use search::{
    FailureCause, Flight, SearchFailure, SearchHandle, SearchOptions, SearchOrchestrator,
    SearchParams, SearchResults, SearchState,
};

// ============================================================================
// Modules
// ============================================================================

pub mod backoff;
pub mod config;
pub mod error;
pub mod executor;
pub mod failure;
pub mod network;
pub mod policy;
pub mod request;
pub mod search;
pub mod transport;
