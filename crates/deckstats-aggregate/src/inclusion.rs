//! Per-card inclusion statistics for one board.

use std::collections::BTreeMap;

use deckstats_core::{
  deck::{Board, Deck},
  table::{Table, Value},
};
use tracing::warn;

use crate::{
  Result,
  group::{GroupKey, grouped, report_table},
  registry::Aggregator,
  win_rate::ratio,
};

#[derive(Debug, Default)]
struct CardStats {
  decks:   i64,
  copies:  i64,
  wins:    i64,
  matches: i64,
}

pub struct InclusionAggregator {
  name:  &'static str,
  board: Board,
}

impl InclusionAggregator {
  pub fn new(name: &'static str, board: Board) -> Self { Self { name, board } }
}

impl Aggregator for InclusionAggregator {
  fn name(&self) -> &'static str { self.name }

  fn group_by(&self) -> Vec<&'static str> { GroupKey::COLUMNS.to_vec() }

  fn execute(&self, decks: &[Deck]) -> Result<Table> {
    let mut out = report_table(&[
      "card",
      "decks",
      "wins",
      "matches",
      "includeRate",
      "includeAverageNumber",
      "winRate",
    ]);

    for (key, members) in grouped(decks, |_| true) {
      let mut cards: BTreeMap<&str, CardStats> = BTreeMap::new();
      for deck in &members {
        // A card listed twice in one deck still counts as one including deck.
        let mut copies: BTreeMap<&str, i64> = BTreeMap::new();
        for entry in deck.cards(self.board) {
          *copies.entry(entry.name.as_str()).or_default() += i64::from(entry.n);
        }
        for (name, n) in copies {
          let stats = cards.entry(name).or_default();
          stats.decks += 1;
          stats.copies += n;
          stats.wins += deck.wins;
          stats.matches += deck.matches;
        }
      }
      if cards.is_empty() {
        warn!(report = self.name, group = ?key, "no cards found");
        continue;
      }

      let group_decks = members.len() as i64;
      for (name, stats) in cards {
        let mut row = key.values();
        row.extend([
          Value::from(name),
          Value::Int(stats.decks),
          Value::Int(stats.wins),
          Value::Int(stats.matches),
          ratio(stats.decks, group_decks),
          ratio(stats.copies, stats.decks),
          ratio(stats.wins, stats.matches),
        ]);
        out.push_row(row)?;
      }
    }
    Ok(out)
  }
}
