// SPDX-License-Identifier: Apache-2.0

//! Flight result parsing.
//!
//! The backend returns either a bare JSON array of flights or an object with
//! a `flights` array. Entries missing required fields are dropped before the
//! results are counted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::WayfareError;

/// A bookable flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    /// Backend identifier.
    pub id: String,
    /// Operating airline name.
    pub airline: String,
    /// Flight number (e.g. `AI 665`).
    pub flight_number: String,
    /// Origin airport code.
    #[serde(alias = "from")]
    pub origin: String,
    /// Destination airport code.
    #[serde(alias = "to")]
    pub destination: String,
    /// Departure time as sent by the backend.
    pub departure_time: String,
    /// Arrival time as sent by the backend.
    pub arrival_time: String,
    /// Fare, if quoted.
    #[serde(default)]
    pub price: Option<f64>,
    /// Fare currency, if quoted.
    #[serde(default)]
    pub currency: Option<String>,
    /// Remaining seats, if reported.
    #[serde(default)]
    pub seats_available: Option<u32>,
}

impl Flight {
    fn is_complete(&self) -> bool {
        [
            &self.id,
            &self.airline,
            &self.flight_number,
            &self.origin,
            &self.destination,
            &self.departure_time,
            &self.arrival_time,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Validated search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    /// Well-formed flights in backend order.
    pub flights: Vec<Flight>,
    /// Number of malformed entries that were dropped.
    pub discarded: usize,
    /// Attempts the search needed.
    pub attempts_used: u32,
}

/// Parses a response body into well-formed flights.
///
/// Returns the flights and the number of discarded entries.
///
/// # Errors
///
/// Returns `WayfareError::InvalidResponse` for non-JSON bodies and
/// `WayfareError::UnexpectedPayload` when no flight list is present.
pub fn parse_flights(body: &str) -> Result<(Vec<Flight>, usize), WayfareError> {
    let value: Value = serde_json::from_str(body).map_err(WayfareError::InvalidResponse)?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("flights") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(WayfareError::UnexpectedPayload {
                    message: "expected a `flights` array".to_string(),
                });
            }
        },
        _ => {
            return Err(WayfareError::UnexpectedPayload {
                message: "expected a JSON array or object".to_string(),
            });
        }
    };

    let total = entries.len();
    let flights: Vec<Flight> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<Flight>(entry).ok())
        .filter(Flight::is_complete)
        .collect();
    let discarded = total - flights.len();

    if discarded > 0 {
        debug!(discarded, kept = flights.len(), "Dropped malformed flight entries");
    }

    Ok((flights, discarded))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLIGHT: &str = r#"{
        "id": "f1",
        "airline": "Air India",
        "flightNumber": "AI 665",
        "origin": "DEL",
        "destination": "BOM",
        "departureTime": "2024-12-01T06:00:00+05:30",
        "arrivalTime": "2024-12-01T08:10:00+05:30",
        "price": 5400.0,
        "currency": "INR"
    }"#;

    #[test]
    fn test_parses_bare_array() {
        let (flights, discarded) = parse_flights(&format!("[{FLIGHT}]")).expect("valid");
        assert_eq!(flights.len(), 1);
        assert_eq!(discarded, 0);
        assert_eq!(flights[0].flight_number, "AI 665");
        assert_eq!(flights[0].price, Some(5400.0));
        assert_eq!(flights[0].seats_available, None);
    }

    #[test]
    fn test_parses_wrapped_object() {
        let (flights, _) = parse_flights(&format!(r#"{{"flights": [{FLIGHT}]}}"#)).expect("valid");
        assert_eq!(flights.len(), 1);
    }

    #[test]
    fn test_accepts_route_aliases() {
        let body = r#"[{"id":"f2","airline":"IndiGo","flightNumber":"6E 2011",
            "from":"DEL","to":"BOM","departureTime":"06:00","arrivalTime":"08:05"}]"#;
        let (flights, _) = parse_flights(body).expect("valid");
        assert_eq!(flights[0].origin, "DEL");
        assert_eq!(flights[0].destination, "BOM");
    }

    #[test]
    fn test_drops_malformed_entries() {
        let body = format!(
            r#"[{FLIGHT}, {{"id": "f3"}}, 42, {{"id":"","airline":"X","flightNumber":"X1",
            "origin":"A","destination":"B","departureTime":"t","arrivalTime":"t"}}]"#
        );
        let (flights, discarded) = parse_flights(&body).expect("valid");
        assert_eq!(flights.len(), 1);
        assert_eq!(discarded, 3);
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(
            parse_flights("<html>"),
            Err(WayfareError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_rejects_unexpected_shape() {
        assert!(matches!(
            parse_flights(r#"{"data": []}"#),
            Err(WayfareError::UnexpectedPayload { .. })
        ));
        assert!(matches!(
            parse_flights("\"flights\""),
            Err(WayfareError::UnexpectedPayload { .. })
        ));
    }
}
