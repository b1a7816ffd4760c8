//! [`SqliteStore`]: the SQLite implementation of [`DeckStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use deckstats_core::{
  deck::{Board, CardEntry, col},
  store::{DeckStore, LoadSummary},
  table::{Table, Value},
};
use rusqlite::{Connection, params, types::ValueRef};
use strum::IntoEnumIterator as _;
use tracing::info;

use crate::{
  Result,
  copy::quote,
  encode::decode_dt,
  loader::{BulkLoader, Conflict},
  plan::{LoadPlan, deck_columns},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A deck store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. The
/// connection lives as long as the last clone.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load `data` into `dest` through a staging table, in a transaction of
  /// its own. `key` names the conflict target; it may be empty for
  /// [`Conflict::Append`].
  pub async fn bulk_load(
    &self,
    dest: impl Into<String>,
    key: &[&str],
    data: Table,
    conflict: Conflict,
  ) -> Result<usize> {
    let dest = dest.into();
    let key: Vec<String> = key.iter().map(|k| (*k).to_owned()).collect();
    self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let key: Vec<&str> = key.iter().map(String::as_str).collect();
          BulkLoader::new(tx).upsert(&dest, &key, &data, conflict)
        }))
      })
      .await?
  }
}

/// Run `f` in a transaction; commit on `Ok`, roll back on `Err`.
fn in_transaction<T>(conn: &mut Connection, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
  let tx = conn.transaction()?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

/// People, archetypes, decks, then the card entries of changed decks.
fn load_plan(conn: &Connection, plan: &LoadPlan) -> Result<LoadSummary> {
  let loader = BulkLoader::new(conn);

  let people = loader.upsert("people", &["id"], &plan.people, Conflict::DoNothing)?;
  let archetypes = loader.upsert("archetypes", &["id"], &plan.archetypes, Conflict::UpdateAll)?;

  // Versions are compared before the merge overwrites them.
  let staged = loader.stage("decks", &plan.decks)?;
  let changed = loader.changed_parents(&staged, "decks", col::ID, col::UPDATED)?;
  let columns: Vec<&str> = plan.decks.column_names().collect();
  let decks = loader.merge(&staged, "decks", &[col::ID], &columns, Conflict::UpdateAll)?;
  loader.drop_staging(&staged)?;

  let mut summary = LoadSummary {
    people,
    archetypes,
    decks,
    changed_decks: changed.ids.len(),
    ..LoadSummary::default()
  };
  for (board, entries) in &plan.boards {
    let rows = loader.replace_children(board.table(), "deckId", &changed, entries)?;
    match board {
      Board::Maindeck => summary.maindecks = rows,
      Board::Sideboard => summary.sideboards = rows,
    }
  }
  loader.drop_staging(&changed.table)?;
  Ok(summary)
}

// ─── Season read-back ────────────────────────────────────────────────────────

/// Stored decks of one season joined with their labels, plus one JSON card
/// list per board.
fn read_season(conn: &Connection, season_id: i64) -> Result<Table> {
  let mut names = deck_columns();
  let select = names.iter().map(|c| format!("d.{}", quote(c))).collect::<Vec<_>>().join(", ");
  names.extend([col::PERSON.to_owned(), col::ARCHETYPE_NAME.to_owned()]);
  let sql = format!(
    "SELECT {select}, p.name, a.archetype
     FROM decks AS d
       LEFT JOIN people AS p ON p.id = d.personId
       LEFT JOIN archetypes AS a ON a.id = d.archetypeId
     WHERE d.seasonId = ?1
     ORDER BY d.id"
  );

  let mut table = Table::with_columns(&names);
  let mut stmt = conn.prepare(&sql)?;
  let mut rows = stmt.query(params![season_id])?;
  while let Some(row) = rows.next()? {
    let values = names
      .iter()
      .enumerate()
      .map(|(i, name)| read_cell(name, row.get_ref(i)?))
      .collect::<Result<Vec<_>>>()?;
    table.push_row(values)?;
  }

  for board in Board::iter() {
    let mut lists = board_lists(conn, board, season_id)?;
    let cells = table
      .values(col::ID)?
      .iter()
      .map(|id| -> Result<Value> {
        let cards = id.as_i64().and_then(|id| lists.remove(&id)).unwrap_or_default();
        Ok(Value::Json(serde_json::to_value(cards)?))
      })
      .collect::<Result<Vec<_>>>()?;
    table.set_column(board.column(), cells)?;
  }
  Ok(table)
}

fn is_flag(column: &str) -> bool { column == col::RETIRED || column.starts_with("colorHas") }

fn read_cell(column: &str, cell: ValueRef<'_>) -> Result<Value> {
  Ok(match cell {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) if is_flag(column) => Value::Bool(i != 0),
    ValueRef::Integer(i) => Value::Int(i),
    ValueRef::Real(f) => Value::Float(f),
    ValueRef::Text(raw) | ValueRef::Blob(raw) => {
      let text = String::from_utf8_lossy(raw);
      if column == col::CREATED || column == col::UPDATED {
        Value::Timestamp(decode_dt(&text)?)
      } else {
        Value::Str(text.into_owned())
      }
    }
  })
}

/// Card entries of one board for every deck of the season, by deck id.
fn board_lists(conn: &Connection, board: Board, season_id: i64) -> Result<HashMap<i64, Vec<CardEntry>>> {
  let sql = format!(
    "SELECT c.deckId, c.n, c.name
     FROM {t} AS c JOIN decks AS d ON d.id = c.deckId
     WHERE d.seasonId = ?1
     ORDER BY c.id",
    t = quote(board.table()),
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map(params![season_id], |r| {
    Ok((r.get::<_, i64>(0)?, CardEntry::new(r.get(1)?, r.get::<_, String>(2)?)))
  })?;
  let mut lists: HashMap<i64, Vec<CardEntry>> = HashMap::new();
  for row in rows {
    let (deck, card) = row?;
    lists.entry(deck).or_default().push(card);
  }
  Ok(lists)
}

// ─── DeckStore impl ──────────────────────────────────────────────────────────

impl DeckStore for SqliteStore {
  type Error = crate::Error;

  async fn load_dataset<'a>(&'a self, dataset: &'a Table) -> Result<LoadSummary> {
    let plan = LoadPlan::from_dataset(dataset)?;
    let summary = self
      .conn
      .call(move |conn| Ok(in_transaction(conn, |tx| load_plan(tx, &plan))))
      .await??;
    info!(
      people = summary.people,
      archetypes = summary.archetypes,
      decks = summary.decks,
      changed = summary.changed_decks,
      maindecks = summary.maindecks,
      sideboards = summary.sideboards,
      "dataset loaded"
    );
    Ok(summary)
  }

  async fn last_updated(&self, season_id: i64) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT max(updatedDatetime) FROM decks WHERE seasonId = ?1",
          params![season_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    raw.as_deref().map(decode_dt).transpose()
  }

  async fn season_dataset(&self, season_id: i64) -> Result<Table> {
    let table = self
      .conn
      .call(move |conn| Ok(read_season(conn, season_id)))
      .await??;
    info!(season_id, decks = table.len(), "season read back");
    Ok(table)
  }

  async fn cards(&self, deck_id: i64, board: Board) -> Result<Vec<CardEntry>> {
    let sql = format!("SELECT n, name FROM {} WHERE deckId = ?1 ORDER BY id", quote(board.table()));
    let cards = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![deck_id], |r| Ok(CardEntry::new(r.get(0)?, r.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(cards)
  }
}

#[cfg(test)]
impl SqliteStore {
  /// First column of the first row of `sql`.
  pub(crate) async fn scalar<T>(&self, sql: &str) -> T
  where
    T: rusqlite::types::FromSql + Send + 'static,
  {
    let sql = sql.to_owned();
    self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await
      .expect("scalar query")
  }
}
