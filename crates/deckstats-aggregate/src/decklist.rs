//! Representative decklists per archetype.
//!
//! Every copy of a card in a deck is a separate unit (`"Island" #0`,
//! `"Island" #1`, …). Units are weighted by their deck, weights are summed
//! per unit across the group, and the heaviest units up to the board size
//! form the representative list. Sorting happens per group only.

use std::collections::HashMap;

use deckstats_core::{
  deck::{Board, CardEntry, Deck},
  table::{Table, Value},
};
use strum::{Display, EnumString, IntoEnumIterator as _};
use tracing::warn;

use crate::{
  Result,
  group::{GroupKey, grouped, report_table},
  registry::Aggregator,
};

/// How much one deck's cards count towards its archetype's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Weighting {
  /// Matches played.
  RawMatches,
  /// `max(wins - losses, 0)`.
  ClippedNetWins,
}

impl Weighting {
  pub fn weight(self, deck: &Deck) -> i64 {
    match self {
      Self::RawMatches => deck.matches,
      Self::ClippedNetWins => (deck.wins - deck.losses).max(0),
    }
  }
}

/// The top `board.size()` units of `decks`, collapsed back into card
/// entries. Equal weights keep first-seen order, so the earlier unit wins
/// at the cutoff.
pub fn representative(decks: &[&Deck], board: Board, weighting: Weighting) -> Vec<CardEntry> {
  let mut units: Vec<((&str, u32), i64)> = Vec::new();
  let mut index: HashMap<(&str, u32), usize> = HashMap::new();
  for deck in decks {
    let weight = weighting.weight(deck);
    for entry in deck.cards(board) {
      for copy in 0..entry.n {
        let unit = (entry.name.as_str(), copy);
        let slot = *index.entry(unit).or_insert_with(|| {
          units.push((unit, 0));
          units.len() - 1
        });
        units[slot].1 += weight;
      }
    }
  }
  // Stable, so ties stay in first-seen order.
  units.sort_by(|a, b| b.1.cmp(&a.1));

  let mut cards: Vec<CardEntry> = Vec::new();
  for ((name, _), _) in units.into_iter().take(board.size()) {
    match cards.iter_mut().find(|c| c.name == name) {
      Some(card) => card.n += 1,
      None => cards.push(CardEntry::new(1, name)),
    }
  }
  cards.sort_by(|a, b| b.n.cmp(&a.n));
  cards
}

pub struct DecklistAggregator {
  name:      &'static str,
  weighting: Weighting,
}

impl DecklistAggregator {
  pub fn new(name: &'static str, weighting: Weighting) -> Self { Self { name, weighting } }
}

impl Aggregator for DecklistAggregator {
  fn name(&self) -> &'static str { self.name }

  fn group_by(&self) -> Vec<&'static str> { GroupKey::COLUMNS.to_vec() }

  fn execute(&self, decks: &[Deck]) -> Result<Table> {
    let boards: Vec<Board> = Board::iter().collect();
    let mut extra = vec!["decks"];
    extra.extend(boards.iter().map(|b| b.column()));
    let mut out = report_table(&extra);

    for (key, members) in grouped(decks, |_| true) {
      let lists: Vec<Vec<CardEntry>> =
        boards.iter().map(|b| representative(&members, *b, self.weighting)).collect();
      if lists.iter().all(Vec::is_empty) {
        warn!(report = self.name, group = ?key, "no cards found");
        continue;
      }

      let mut row = key.values();
      row.push(Value::Int(members.len() as i64));
      for cards in lists {
        row.push(Value::Json(serde_json::to_value(cards)?));
      }
      out.push_row(row)?;
    }
    Ok(out)
  }
}
