//! Report aggregation over the normalized deck dataset.
//!
//! Each report is an [`Aggregator`]: a pure function from decks to a report
//! [`Table`](deckstats_core::table::Table), grouped by a fixed key. Reports
//! are registered by name in the static [`REPORTS`] table and run by the
//! [`AggregationEngine`], which hands every result to a [`ReportSink`].

mod day;
mod decklist;
mod engine;
mod group;
mod inclusion;
mod registry;
mod win_rate;

pub mod error;

pub use day::DayAggregator;
pub use decklist::{DecklistAggregator, Weighting, representative};
pub use engine::{AggregationEngine, Report, ReportSink};
pub use error::{Error, Result};
pub use group::{COMBINED_SOURCE, GroupKey};
pub use inclusion::InclusionAggregator;
pub use registry::{Aggregator, REPORTS, Registration, Settings, lookup};
pub use win_rate::{WinRateAggregator, smoothed_win_rate};

#[cfg(test)]
mod testutil;
