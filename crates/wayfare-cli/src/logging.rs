// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the Wayfare CLI.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging.
//! Log level can be controlled via the `RUST_LOG` environment variable.
//!
//! # Examples
//!
//! ```bash
//! # Show every retry decision
//! RUST_LOG=wayfare=debug wayfare search --from DEL --to BOM --date 2024-12-01
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Default directives when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "wayfare=warn,reqwest=error";

/// Default directives with `--verbose`.
const VERBOSE_FILTER: &str = "wayfare=debug,reqwest=warn";

/// Initialize the logging subsystem.
///
/// Logs go to stderr so `--output json` stays machine-readable.
/// `RUST_LOG` takes precedence over the `verbose` flag.
pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_filter = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
