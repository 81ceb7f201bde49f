// SPDX-License-Identifier: Apache-2.0

//! Search input and local validation.

use bon::Builder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ValidationError;

/// Flight search input as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct SearchParams {
    /// Origin airport code (e.g. `DEL`).
    #[builder(into)]
    pub from: String,
    /// Destination airport code (e.g. `BOM`).
    #[builder(into)]
    pub to: String,
    /// Travel date as `YYYY-MM-DD`.
    #[builder(into)]
    pub date: String,
    /// Number of passengers.
    #[builder(default = 1)]
    pub passengers: u32,
}

impl SearchParams {
    /// Checks local preconditions for starting a search.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`]. Connectivity is checked
    /// last so input problems are reported even while offline.
    pub fn validate(&self, online: bool) -> Result<ValidatedSearch, ValidationError> {
        let from = self.from.trim().to_ascii_uppercase();
        if from.is_empty() {
            return Err(ValidationError::MissingOrigin);
        }

        let to = self.to.trim().to_ascii_uppercase();
        if to.is_empty() {
            return Err(ValidationError::MissingDestination);
        }

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            ValidationError::InvalidDate {
                date: self.date.clone(),
            }
        })?;

        if self.passengers == 0 {
            return Err(ValidationError::NoPassengers);
        }

        if !online {
            return Err(ValidationError::Offline);
        }

        Ok(ValidatedSearch {
            from,
            to,
            date,
            passengers: self.passengers,
        })
    }
}

/// Search input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSearch {
    /// Normalized origin code.
    pub from: String,
    /// Normalized destination code.
    pub to: String,
    /// Travel date.
    pub date: NaiveDate,
    /// Number of passengers (at least 1).
    pub passengers: u32,
}

impl ValidatedSearch {
    /// Builds the backend request payload.
    #[must_use]
    pub fn payload(&self) -> Value {
        json!({
            "from": self.from,
            "to": self.to,
            "date": self.date.format("%Y-%m-%d").to_string(),
            "passengers": self.passengers,
        })
    }
}
