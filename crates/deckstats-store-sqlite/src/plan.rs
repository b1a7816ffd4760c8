//! Splitting a normalized deck dataset into the rows of each stored table.

use deckstats_core::{
  deck::{Board, COLORS, col, color_column, decode_cards},
  table::{Table, Value},
};
use strum::IntoEnumIterator as _;

use crate::Result;

/// Columns of the `decks` table, in DDL order.
pub fn deck_columns() -> Vec<String> {
  let mut columns: Vec<String> =
    [col::ID, col::NAME, col::SEASON_ID, col::SOURCE_NAME, col::PERSON_ID, col::ARCHETYPE_ID]
      .map(String::from)
      .into();
  columns.extend(COLORS.iter().map(|c| color_column(*c)));
  columns.extend(
    [
      col::CREATED,
      col::UPDATED,
      col::URL,
      col::COMPETITION_ID,
      col::FINISH,
      col::RETIRED,
      col::WINS,
      col::LOSSES,
      col::DRAWS,
      col::MATCHES,
      col::OMW_PERCENT,
    ]
    .map(String::from),
  );
  columns
}

/// Per-table batches derived from one dataset, in load order.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
  /// `id, name`, one row per distinct person.
  pub people:     Table,
  /// `id, archetype`, one row per distinct archetype.
  pub archetypes: Table,
  pub decks:      Table,
  /// `deckId, n, name` for each board.
  pub boards:     Vec<(Board, Table)>,
}

impl LoadPlan {
  /// Repeated deck ids keep their first row.
  pub fn from_dataset(dataset: &Table) -> Result<Self> {
    let dataset = dataset.drop_duplicates(&[col::ID])?;
    Ok(Self {
      people:     dimension(&dataset, col::PERSON_ID, col::PERSON, "name")?,
      archetypes: dimension(&dataset, col::ARCHETYPE_ID, col::ARCHETYPE_NAME, "archetype")?,
      decks:      dataset.select(&deck_columns())?,
      boards:     Board::iter()
        .map(|board| Ok((board, entries(&dataset, board)?)))
        .collect::<Result<_>>()?,
    })
  }
}

fn dimension(dataset: &Table, id: &str, label: &str, label_as: &str) -> Result<Table> {
  let mut table = dataset.select(&[id, label])?;
  table.rename(&[(id, "id"), (label, label_as)]);
  let ids = table.values("id")?;
  let present = table.filter_rows(|i| !ids[i].is_null());
  Ok(present.drop_duplicates(&["id"])?)
}

fn entries(dataset: &Table, board: Board) -> Result<Table> {
  let mut out = Table::with_columns(&["deckId", "n", "name"]);
  let ids = dataset.values(col::ID)?;
  let lists = dataset.values(board.column())?;
  for (id, cards) in ids.iter().zip(lists) {
    for card in decode_cards(cards)? {
      out.push_row(vec![id.clone(), Value::Int(card.n.into()), Value::Str(card.name)])?;
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn dataset() -> Table {
    let deck = |id: i64, person: i64, archetype: i64| {
      let mut record = json!({
        "id": id, "name": "d", "seasonId": 30, "sourceName": "League",
        "person": format!("p{person}"), "personId": person,
        "archetypeId": archetype, "archetypeName": format!("a{archetype}"),
        "createdDatetime": null, "updatedDatetime": null, "url": null,
        "competitionId": null, "finish": null, "retired": false,
        "wins": 1, "losses": 0, "draws": 0, "matches": 1, "omwPercent": null,
        "maindeck": [{ "n": 4, "name": "Island" }, { "n": 2, "name": "Opt" }],
        "sideboard": [],
      });
      for c in COLORS {
        record[color_column(c)] = json!(false);
      }
      record
    };
    Table::from_records(vec![deck(1, 7, 3), deck(2, 7, 3), deck(1, 8, 4), deck(3, 9, -1)]).unwrap()
  }

  #[test]
  fn splits_into_tables() {
    let plan = LoadPlan::from_dataset(&dataset()).unwrap();
    assert_eq!(plan.decks.len(), 3);
    assert_eq!(plan.decks.column_names().count(), deck_columns().len());
    // The repeated deck 1 is dropped before dimensions are derived, so
    // person 8 and archetype 4 never appear.
    assert_eq!(plan.people.values("id").unwrap(), [Value::Int(7), Value::Int(9)]);
    assert_eq!(plan.archetypes.values("id").unwrap(), [Value::Int(3), Value::Int(-1)]);
    assert_eq!(plan.archetypes.row(0).get("archetype"), &Value::from("a3"));
  }

  #[test]
  fn explodes_card_lists() {
    let plan = LoadPlan::from_dataset(&dataset()).unwrap();
    let (board, maindecks) = &plan.boards[0];
    assert_eq!(*board, Board::Maindeck);
    assert_eq!(maindecks.len(), 6);
    assert_eq!(maindecks.row(1).get("name"), &Value::from("Opt"));
    assert_eq!(maindecks.row(1).get("n"), &Value::Int(2));
    assert!(plan.boards[1].1.is_empty());
  }
}
