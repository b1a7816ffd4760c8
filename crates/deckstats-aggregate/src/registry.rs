//! The [`Aggregator`] trait and the static table of registered reports.

use chrono::{DateTime, Utc};
use deckstats_core::{
  deck::{Board, Deck},
  table::Table,
};

use crate::{
  DayAggregator, DecklistAggregator, InclusionAggregator, Result, Weighting, WinRateAggregator,
};

/// A report computed from the whole normalized deck dataset.
pub trait Aggregator: Send + Sync {
  /// Registered report name, also the output file key.
  fn name(&self) -> &'static str;

  /// Grouping columns of the output; sinks partition by them.
  fn group_by(&self) -> Vec<&'static str>;

  fn execute(&self, decks: &[Deck]) -> Result<Table>;
}

/// Run-wide knobs handed to every report constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
  /// Decks need strictly more matches than this to count towards win rates.
  pub win_rate_min_matches: i64,
  /// Stand-in for a missing `updatedDatetime` in the daily report.
  pub now:                  DateTime<Utc>,
}

impl Settings {
  pub fn new(now: DateTime<Utc>) -> Self { Self { win_rate_min_matches: 2, now } }
}

/// A named report constructor.
pub struct Registration {
  pub name:  &'static str,
  pub build: fn(&Settings) -> Box<dyn Aggregator>,
}

/// Every report, in the order they run.
pub static REPORTS: &[Registration] = &[
  Registration { name: WinRateAggregator::NAME, build: win_rate },
  Registration { name: "average_archetype_deck", build: average_deck },
  Registration { name: "average_net_wins_archetype_deck", build: net_wins_deck },
  Registration { name: "average_archetype_maindeck", build: maindeck_cards },
  Registration { name: "average_archetype_sideboard", build: sideboard_cards },
  Registration { name: DayAggregator::NAME, build: archetype_day },
];

pub fn lookup(name: &str) -> Option<&'static Registration> { REPORTS.iter().find(|r| r.name == name) }

fn win_rate(settings: &Settings) -> Box<dyn Aggregator> {
  Box::new(WinRateAggregator::new(settings.win_rate_min_matches))
}

fn average_deck(_: &Settings) -> Box<dyn Aggregator> {
  Box::new(DecklistAggregator::new("average_archetype_deck", Weighting::RawMatches))
}

fn net_wins_deck(_: &Settings) -> Box<dyn Aggregator> {
  Box::new(DecklistAggregator::new("average_net_wins_archetype_deck", Weighting::ClippedNetWins))
}

fn maindeck_cards(_: &Settings) -> Box<dyn Aggregator> {
  Box::new(InclusionAggregator::new("average_archetype_maindeck", Board::Maindeck))
}

fn sideboard_cards(_: &Settings) -> Box<dyn Aggregator> {
  Box::new(InclusionAggregator::new("average_archetype_sideboard", Board::Sideboard))
}

fn archetype_day(settings: &Settings) -> Box<dyn Aggregator> { Box::new(DayAggregator::new(settings.now)) }

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn names_are_unique_and_match_their_aggregator() {
    let settings = Settings::new(Utc::now());
    let names: HashSet<&str> = REPORTS.iter().map(|r| r.name).collect();
    assert_eq!(names.len(), REPORTS.len());
    for registration in REPORTS {
      assert_eq!((registration.build)(&settings).name(), registration.name);
    }
  }

  #[test]
  fn lookup_by_name() {
    assert!(lookup("archetype_day").is_some());
    assert!(lookup("archetype_week").is_none());
  }
}
