// SPDX-License-Identifier: Apache-2.0

//! Flight search: parameters, results, state and the orchestrator that
//! drives them.

pub mod orchestrator;
pub mod params;
pub mod results;
pub mod state;

pub use orchestrator::{SearchHandle, SearchOptions, SearchOrchestrator};
pub use params::{SearchParams, ValidatedSearch};
pub use results::{Flight, SearchResults, parse_flights};
pub use state::{FailureCause, SearchFailure, SearchState};
