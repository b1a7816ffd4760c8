//! The `DeckStore` trait and the summary it reports after a load.
//!
//! The trait is implemented by storage backends (e.g.
//! `deckstats-store-sqlite`). The pipeline depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  deck::{Board, CardEntry},
  table::Table,
};

/// Row counts written by one [`DeckStore::load_dataset`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
  pub people:        usize,
  pub archetypes:    usize,
  pub decks:         usize,
  /// Decks that were new or strictly newer than the stored copy; only these
  /// had their card entries replaced.
  pub changed_decks: usize,
  pub maindecks:     usize,
  pub sideboards:    usize,
}

/// Abstraction over the relational store the pipeline loads into.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait DeckStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a normalized deck dataset: people and archetypes first, then
  /// decks, then the card entries of every changed deck. Atomic: either the
  /// whole dataset lands or nothing does.
  fn load_dataset<'a>(
    &'a self,
    dataset: &'a Table,
  ) -> impl Future<Output = Result<LoadSummary, Self::Error>> + Send + 'a;

  /// Latest stored `updatedDatetime` among the decks of `season_id`.
  fn last_updated(
    &self,
    season_id: i64,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + '_;

  /// Every stored deck of `season_id` with its person, archetype label and
  /// card lists, in the layout of a normalized dataset, ordered by deck id.
  fn season_dataset(
    &self,
    season_id: i64,
  ) -> impl Future<Output = Result<Table, Self::Error>> + Send + '_;

  /// Stored card entries of one board of one deck, in insertion order.
  fn cards(
    &self,
    deck_id: i64,
    board: Board,
  ) -> impl Future<Output = Result<Vec<CardEntry>, Self::Error>> + Send + '_;
}
