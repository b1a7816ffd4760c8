//! Deck domain types and the column names of the normalized deck dataset.
//!
//! A [`Deck`] is the aggregate root: it exclusively owns its maindeck and
//! sideboard [`CardEntry`] lists. People and archetypes are shared dimensions
//! referenced by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
  Error, Result,
  table::{Row, Table, Value},
};

/// Column names of the normalized deck dataset, as produced by the transformer.
pub mod col {
  pub const ID: &str = "id";
  pub const NAME: &str = "name";
  pub const SEASON_ID: &str = "seasonId";
  pub const SOURCE_NAME: &str = "sourceName";
  pub const PERSON: &str = "person";
  pub const PERSON_ID: &str = "personId";
  pub const ARCHETYPE_ID: &str = "archetypeId";
  pub const ARCHETYPE_NAME: &str = "archetypeName";
  pub const COLORS: &str = "colors";
  pub const CREATED: &str = "createdDatetime";
  pub const UPDATED: &str = "updatedDatetime";
  pub const CREATED_DATE: &str = "createdDate";
  pub const UPDATED_DATE: &str = "updatedDate";
  pub const URL: &str = "url";
  pub const COMPETITION_ID: &str = "competitionId";
  pub const FINISH: &str = "finish";
  pub const RETIRED: &str = "retired";
  pub const WINS: &str = "wins";
  pub const LOSSES: &str = "losses";
  pub const DRAWS: &str = "draws";
  pub const MATCHES: &str = "matches";
  pub const OMW: &str = "omw";
  pub const OMW_PERCENT: &str = "omwPercent";
  pub const MAINDECK: &str = "maindeck";
  pub const SIDEBOARD: &str = "sideboard";
}

/// Mana-color symbols, one `colorHas<X>` flag per symbol.
pub const COLORS: [char; 7] = ['W', 'U', 'B', 'R', 'G', 'C', 'S'];

/// Name of the boolean column flagging color `symbol`.
pub fn color_column(symbol: char) -> String { format!("colorHas{symbol}") }

/// Archetype id given to decks the source has not classified.
pub const UNKNOWN_ARCHETYPE_ID: i64 = -1;
/// Archetype label given to decks the source has not classified.
pub const UNKNOWN_ARCHETYPE_NAME: &str = "N/A";

// ─── Boards ──────────────────────────────────────────────────────────────────

/// One of the two card zones of a deck.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Board {
  Maindeck,
  Sideboard,
}

impl Board {
  /// Dataset column holding this board's card list.
  pub fn column(self) -> &'static str {
    match self {
      Self::Maindeck => col::MAINDECK,
      Self::Sideboard => col::SIDEBOARD,
    }
  }

  /// Relational table storing this board's entries.
  pub fn table(self) -> &'static str {
    match self {
      Self::Maindeck => "maindecks",
      Self::Sideboard => "sideboards",
    }
  }

  /// Nominal card count of the board.
  pub fn size(self) -> usize {
    match self {
      Self::Maindeck => 60,
      Self::Sideboard => 15,
    }
  }
}

// ─── Cards ───────────────────────────────────────────────────────────────────

/// `n` copies of the card `name` within one board of one deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
  pub n:    u32,
  pub name: String,
}

impl CardEntry {
  pub fn new(n: u32, name: impl Into<String>) -> Self { Self { n, name: name.into() } }
}

/// Decode a card-list cell. Null cells are empty boards.
pub fn decode_cards(value: &Value) -> Result<Vec<CardEntry>> {
  match value {
    Value::Null => Ok(Vec::new()),
    Value::Json(j) => Ok(serde_json::from_value(j.clone())?),
    other => Err(Error::InvalidValue {
      row:     0,
      column:  "cards".to_owned(),
      message: format!("expected a card list, got {other:?}"),
    }),
  }
}

// ─── Deck ────────────────────────────────────────────────────────────────────

/// A typed view of one normalized deck row, as consumed by the aggregators.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
  pub id:             i64,
  pub season_id:      Option<i64>,
  pub source_name:    Option<String>,
  pub person_id:      Option<i64>,
  pub archetype_id:   Option<i64>,
  pub archetype_name: Option<String>,
  pub wins:           i64,
  pub losses:         i64,
  pub draws:          i64,
  pub matches:        i64,
  pub created:        Option<DateTime<Utc>>,
  pub updated:        Option<DateTime<Utc>>,
  pub maindeck:       Vec<CardEntry>,
  pub sideboard:      Vec<CardEntry>,
}

impl Deck {
  pub fn cards(&self, board: Board) -> &[CardEntry] {
    match board {
      Board::Maindeck => &self.maindeck,
      Board::Sideboard => &self.sideboard,
    }
  }

  pub fn from_row(row: Row<'_>) -> Result<Self> {
    let invalid = |column: &str, message: &str| Error::InvalidValue {
      row:     row.index(),
      column:  column.to_owned(),
      message: message.to_owned(),
    };
    let count = |column: &str| row.get(column).as_i64().unwrap_or(0);
    let cards = |column: &str| {
      decode_cards(row.get(column)).map_err(|e| invalid(column, &e.to_string()))
    };

    Ok(Self {
      id:             row.get(col::ID).as_i64().ok_or_else(|| invalid(col::ID, "missing deck id"))?,
      season_id:      row.get(col::SEASON_ID).as_i64(),
      source_name:    row.get(col::SOURCE_NAME).as_str().map(str::to_owned),
      person_id:      row.get(col::PERSON_ID).as_i64(),
      archetype_id:   row.get(col::ARCHETYPE_ID).as_i64(),
      archetype_name: row.get(col::ARCHETYPE_NAME).as_str().map(str::to_owned),
      wins:           count(col::WINS),
      losses:         count(col::LOSSES),
      draws:          count(col::DRAWS),
      matches:        count(col::MATCHES),
      created:        row.get(col::CREATED).as_timestamp(),
      updated:        row.get(col::UPDATED).as_timestamp(),
      maindeck:       cards(col::MAINDECK)?,
      sideboard:      cards(col::SIDEBOARD)?,
    })
  }
}

/// Read every row of a normalized dataset as a [`Deck`].
pub fn decks_from_table(table: &Table) -> Result<Vec<Deck>> {
  table.rows().map(Deck::from_row).collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn boards_map_to_columns_and_tables() {
    let boards: Vec<_> = Board::iter().map(|b| (b.column(), b.table(), b.size())).collect();
    assert_eq!(boards, [("maindeck", "maindecks", 60), ("sideboard", "sideboards", 15)]);
    assert_eq!(Board::Sideboard.to_string(), "sideboard");
  }

  #[test]
  fn deck_from_row_reads_cards() {
    let table = Table::from_records(vec![json!({
      "id": 12,
      "seasonId": 30,
      "sourceName": "League",
      "wins": 3,
      "losses": 2,
      "draws": 0,
      "matches": 5,
      "maindeck": [{ "n": 4, "name": "Lightning Bolt" }],
      "sideboard": [],
    })])
    .unwrap();

    let decks = decks_from_table(&table).unwrap();
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].id, 12);
    assert_eq!(decks[0].source_name.as_deref(), Some("League"));
    assert_eq!(decks[0].maindeck, [CardEntry::new(4, "Lightning Bolt")]);
    assert!(decks[0].sideboard.is_empty());
  }

  #[test]
  fn deck_without_id_is_rejected() {
    let table = Table::from_records(vec![json!({ "wins": 1 })]).unwrap();
    assert!(matches!(
      decks_from_table(&table),
      Err(Error::InvalidValue { column, .. }) if column == "id"
    ));
  }
}
