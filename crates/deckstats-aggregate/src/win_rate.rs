//! `archetype_win_rate`: win rates per archetype, with Laplace smoothing.

use std::collections::HashSet;

use deckstats_core::{
  deck::Deck,
  table::{Table, Value},
};

use crate::{
  Result,
  group::{GroupKey, grouped, report_table},
  registry::Aggregator,
};

/// `(wins + 1) / (matches + 2)`: pulls small samples toward one half.
pub fn smoothed_win_rate(wins: i64, matches: i64) -> f64 { (wins as f64 + 1.0) / (matches as f64 + 2.0) }

/// `num / den`, or null when `den` is zero.
pub(crate) fn ratio(num: i64, den: i64) -> Value {
  if den == 0 { Value::Null } else { Value::Float(num as f64 / den as f64) }
}

pub struct WinRateAggregator {
  min_matches: i64,
}

impl WinRateAggregator {
  pub const NAME: &'static str = "archetype_win_rate";

  /// Only decks with strictly more than `min_matches` matches count.
  pub fn new(min_matches: i64) -> Self { Self { min_matches } }
}

impl Aggregator for WinRateAggregator {
  fn name(&self) -> &'static str { Self::NAME }

  fn group_by(&self) -> Vec<&'static str> { GroupKey::COLUMNS.to_vec() }

  fn execute(&self, decks: &[Deck]) -> Result<Table> {
    let mut out = report_table(&["players", "decks", "wins", "matches", "winRate", "smoothedWinRate"]);
    for (key, members) in grouped(decks, |d| d.matches > self.min_matches) {
      let players = members.iter().filter_map(|d| d.person_id).collect::<HashSet<_>>().len();
      let wins: i64 = members.iter().map(|d| d.wins).sum();
      let matches: i64 = members.iter().map(|d| d.matches).sum();

      let mut row = key.values();
      row.extend([
        Value::Int(players as i64),
        Value::Int(members.len() as i64),
        Value::Int(wins),
        Value::Int(matches),
        ratio(wins, matches),
        Value::Float(smoothed_win_rate(wins, matches)),
      ]);
      out.push_row(row)?;
    }
    Ok(out)
  }
}
