// SPDX-License-Identifier: Apache-2.0

//! `wayfare search` command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use tokio::sync::watch;
use tracing::debug;
use wayfare_core::{
    AppConfig, HttpTransport, NetworkMonitor, SearchOptions, SearchOrchestrator, SearchParams,
    SearchResults, SearchState,
};

use super::maybe_spinner;
use crate::cli::{OutputContext, SearchArgs};
use crate::errors::SearchFailed;

/// Runs one search to completion.
///
/// Ctrl+C cancels the running search.
pub async fn run(args: SearchArgs, ctx: &OutputContext, config: &AppConfig) -> Result<SearchResults> {
    let mut options = SearchOptions::from_config(config)?;
    if let Some(endpoint) = args.endpoint {
        debug!("Overriding search endpoint to: {endpoint}");
        options.endpoint = endpoint;
    }
    if let Some(ms) = args.timeout_ms {
        options.outer_timeout = Some(Duration::from_millis(ms));
    }

    // A one-shot command has no connectivity listener; the monitor stays online
    // and connection failures surface as network errors.
    let transport = HttpTransport::new().context("Failed to create HTTP client")?;
    let handle = SearchOrchestrator::spawn(
        Arc::new(transport),
        Arc::new(NetworkMonitor::default()),
        options,
    );

    let params = SearchParams::builder()
        .from(args.from)
        .to(args.to)
        .date(args.date)
        .passengers(args.passengers)
        .build();
    handle.start_search(params).await?;

    let spinner = maybe_spinner(ctx, "Searching flights...");
    let progress = spinner
        .clone()
        .map(|s| tokio::spawn(track_progress(handle.subscribe(), s)));

    let state = tokio::select! {
        state = handle.wait_until_settled() => state?,
        _ = tokio::signal::ctrl_c() => {
            handle.cancel_search().await?;
            SearchState::Idle
        }
    };

    if let Some(task) = progress {
        task.abort();
    }
    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    match state {
        SearchState::Success(results) => Ok(results),
        SearchState::Error(failure) => Err(SearchFailed(failure).into()),
        _ => bail!("Search cancelled"),
    }
}

/// Mirrors retry progress on the spinner.
async fn track_progress(mut states: watch::Receiver<SearchState>, spinner: ProgressBar) {
    while states.changed().await.is_ok() {
        let retrying = match *states.borrow_and_update() {
            SearchState::Retrying {
                attempt,
                max_attempts,
            } => Some((attempt, max_attempts)),
            _ => None,
        };
        if let Some((attempt, max_attempts)) = retrying {
            spinner.set_message(format!(
                "Search failed, retrying (attempt {attempt}/{max_attempts})..."
            ));
        }
    }
}
