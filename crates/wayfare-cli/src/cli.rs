// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for Wayfare.
//!
//! Uses clap's derive API for declarative CLI parsing.

use std::io::IsTerminal;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI results.
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors (default)
    #[default]
    Text,
    /// JSON output for programmatic consumption
    Json,
}

/// Global output configuration passed to commands.
#[derive(Clone)]
pub struct OutputContext {
    /// Output format (text, json)
    pub format: OutputFormat,
    /// Suppress non-essential output (spinners, progress)
    pub quiet: bool,
    /// Enable verbose output
    pub verbose: bool,
    /// Whether stdout is a terminal (TTY)
    pub is_tty: bool,
}

impl OutputContext {
    /// Creates an `OutputContext` from CLI arguments.
    pub fn from_cli(format: OutputFormat, quiet: bool, verbose: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    /// Returns true if interactive elements (spinners, colors) should be shown.
    pub fn is_interactive(&self) -> bool {
        self.is_tty && !self.quiet && matches!(self.format, OutputFormat::Text)
    }
}

/// Wayfare - resilient flight search.
///
/// Searches a flight backend, retrying transient failures with backoff.
#[derive(Parser)]
#[command(name = "wayfare")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output format (text, json)
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Suppress non-essential output (spinners, progress)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug-level logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search for flights
    Search(SearchArgs),
}

/// Arguments for `wayfare search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Origin airport code (e.g., DEL)
    #[arg(long)]
    pub from: String,

    /// Destination airport code (e.g., BOM)
    #[arg(long)]
    pub to: String,

    /// Travel date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,

    /// Number of passengers
    #[arg(long, short = 'p', default_value_t = 1)]
    pub passengers: u32,

    /// Override the configured search endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Give up on the whole search after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args_parse() {
        let cli = Cli::try_parse_from([
            "wayfare", "search", "--from", "DEL", "--to", "BOM", "--date", "2024-12-01", "-p",
            "2",
        ])
        .expect("valid arguments");
        let Commands::Search(args) = cli.command;
        assert_eq!(args.from, "DEL");
        assert_eq!(args.passengers, 2);
        assert!(args.endpoint.is_none());
    }

    #[test]
    fn test_passengers_default_to_one() {
        let cli = Cli::try_parse_from([
            "wayfare", "search", "--from", "DEL", "--to", "BOM", "--date", "2024-12-01",
        ])
        .expect("valid arguments");
        let Commands::Search(args) = cli.command;
        assert_eq!(args.passengers, 1);
    }
}
