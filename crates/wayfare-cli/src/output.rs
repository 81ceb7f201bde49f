// SPDX-License-Identifier: Apache-2.0

//! Output rendering for CLI commands.
//!
//! Command handlers return data; this module handles presentation.

use std::io::{self, Write};

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use wayfare_core::{Flight, SearchResults};

use crate::cli::{OutputContext, OutputFormat};

/// Trait for types that can be rendered in multiple output formats.
pub trait Renderable: Serialize {
    /// Render as human-readable text to the given writer.
    fn render_text(&self, w: &mut dyn Write, ctx: &OutputContext) -> io::Result<()>;
}

/// Generic render function - handles JSON via serde, delegates text to the trait.
pub fn render<T: Renderable>(result: &T, ctx: &OutputContext) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(result).context("Failed to serialize to JSON")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            result
                .render_text(&mut io::stdout(), ctx)
                .context("Failed to render text")?;
        }
    }
    Ok(())
}

impl Renderable for SearchResults {
    fn render_text(&self, w: &mut dyn Write, ctx: &OutputContext) -> io::Result<()> {
        writeln!(w)?;
        if self.flights.is_empty() {
            writeln!(w, "{}", style("No flights found.").yellow())?;
        } else {
            let noun = if self.flights.len() == 1 {
                "flight"
            } else {
                "flights"
            };
            writeln!(
                w,
                "{}",
                style(format!("Found {} {noun}:", self.flights.len())).bold()
            )?;
            writeln!(w)?;
            for flight in &self.flights {
                writeln!(w, "  {}", flight_line(flight))?;
            }
        }

        if self.discarded > 0 {
            writeln!(w)?;
            writeln!(
                w,
                "{}",
                style(format!("Skipped {} malformed result(s)", self.discarded)).dim()
            )?;
        }
        if ctx.verbose || self.attempts_used > 1 {
            writeln!(
                w,
                "{}",
                style(format!("Completed in {} attempt(s)", self.attempts_used)).dim()
            )?;
        }
        writeln!(w)?;
        Ok(())
    }
}

fn flight_line(flight: &Flight) -> String {
    let price = match (flight.price, flight.currency.as_deref()) {
        (Some(price), Some(currency)) => format!("{currency} {price:.2}"),
        (Some(price), None) => format!("{price:.2}"),
        _ => "-".to_string(),
    };
    format!(
        "{} {} {} {} {}",
        style(format!("{:<10}", flight.flight_number)).cyan(),
        format_args!("{:<16}", flight.airline),
        format_args!("{} -> {}", flight.origin, flight.destination),
        style(format!("{} - {}", flight.departure_time, flight.arrival_time)).dim(),
        style(price).yellow(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> OutputContext {
        OutputContext {
            format: OutputFormat::Text,
            quiet: false,
            verbose: false,
            is_tty: false,
        }
    }

    fn flight() -> Flight {
        serde_json::from_value(serde_json::json!({
            "id": "f1",
            "airline": "IndiGo",
            "flightNumber": "6E 2131",
            "origin": "DEL",
            "destination": "BOM",
            "departureTime": "06:00",
            "arrivalTime": "08:15",
            "price": 5499.0,
            "currency": "INR"
        }))
        .expect("valid flight")
    }

    fn render_to_string(results: &SearchResults) -> String {
        let mut buf = Vec::new();
        results.render_text(&mut buf, &ctx()).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn test_render_lists_flights() {
        let results = SearchResults {
            flights: vec![flight()],
            discarded: 0,
            attempts_used: 1,
        };
        let text = render_to_string(&results);
        assert!(text.contains("Found 1 flight:"));
        assert!(text.contains("6E 2131"));
        assert!(text.contains("DEL -> BOM"));
        assert!(text.contains("INR 5499.00"));
        assert!(!text.contains("attempt"));
    }

    #[test]
    fn test_render_reports_retries_and_discards() {
        let results = SearchResults {
            flights: Vec::new(),
            discarded: 2,
            attempts_used: 3,
        };
        let text = render_to_string(&results);
        assert!(text.contains("No flights found."));
        assert!(text.contains("Skipped 2 malformed result(s)"));
        assert!(text.contains("Completed in 3 attempt(s)"));
    }
}
