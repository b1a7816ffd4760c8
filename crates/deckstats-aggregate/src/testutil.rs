//! Deck fixtures shared by the aggregator tests.

use chrono::{DateTime, TimeZone, Utc};
use deckstats_core::deck::{Board, CardEntry, Deck};

pub(crate) fn noon(day: u32) -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap() }

/// Deck `id` of person `id` in season 30, archetype 3 "Burn".
pub(crate) fn deck(id: i64, source: &str, wins: i64, losses: i64) -> Deck {
  Deck {
    id,
    season_id: Some(30),
    source_name: Some(source.to_owned()),
    person_id: Some(id),
    archetype_id: Some(3),
    archetype_name: Some("Burn".to_owned()),
    wins,
    losses,
    draws: 0,
    matches: wins + losses,
    created: Some(noon(1)),
    updated: Some(noon(1)),
    maindeck: Vec::new(),
    sideboard: Vec::new(),
  }
}

pub(crate) fn with_cards(mut deck: Deck, board: Board, cards: &[(u32, &str)]) -> Deck {
  let entries = cards.iter().map(|(n, name)| CardEntry::new(*n, *name)).collect();
  match board {
    Board::Maindeck => deck.maindeck = entries,
    Board::Sideboard => deck.sideboard = entries,
  }
  deck
}
