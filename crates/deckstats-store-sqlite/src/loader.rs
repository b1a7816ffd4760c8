//! [`BulkLoader`]: staged, verified, set-based merges into one table.
//!
//! Every load follows the same protocol inside the caller's transaction:
//!
//! 1. create `staging_<dest>` as an empty structural copy of `<dest>`;
//! 2. stream the batch into it with [`copy_in`];
//! 3. check that staging holds exactly the batch's row count;
//! 4. `INSERT INTO <dest> … SELECT … FROM staging_<dest>` with the requested
//!    conflict policy;
//! 5. drop the staging table.
//!
//! Staging tables are ordinary tables rather than `TEMP` ones so they share
//! the transaction's fate: a rollback removes them along with everything
//! else.

use std::collections::HashSet;

use deckstats_core::table::Table;
use rusqlite::Connection;
use tracing::debug;

use crate::{
  Error, Result,
  copy::{copy_in, quote, write_table},
};

/// What to do when an incoming row collides with a stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
  /// Plain insert; the table has a surrogate key.
  Append,
  /// Keep the stored row.
  DoNothing,
  /// Overwrite every non-key column with the incoming value.
  UpdateAll,
}

/// Parents that are new, or whose version column is strictly newer than the
/// stored copy. `table` holds the same ids for use in SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedParents {
  pub table: String,
  pub ids:   HashSet<i64>,
}

/// Runs the staging protocol on a connection that is already inside a
/// transaction. Nothing here commits.
pub struct BulkLoader<'c> {
  conn: &'c Connection,
}

pub fn staging_name(dest: &str) -> String { format!("staging_{dest}") }

impl<'c> BulkLoader<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  /// Steps 1–3: create the staging copy of `dest`, stream `data` into it and
  /// verify the count. Returns the staging table name.
  pub fn stage(&self, dest: &str, data: &Table) -> Result<String> {
    let staging = staging_name(dest);
    self.conn.execute_batch(&format!(
      "DROP TABLE IF EXISTS {s};
       CREATE TABLE {s} AS SELECT * FROM {d} WHERE 0;",
      s = quote(&staging),
      d = quote(dest),
    ))?;

    let mut stream = Vec::new();
    write_table(data, &mut stream)?;
    let columns: Vec<&str> = data.column_names().collect();
    let copied = copy_in(self.conn, &staging, &columns, stream.as_slice())?;
    debug!(table = dest, rows = copied, bytes = stream.len(), "staged");

    self.verify_count(&staging, data.len())?;
    Ok(staging)
  }

  /// Fail with [`Error::RowCountMismatch`] unless `table` holds exactly
  /// `expected` rows.
  pub fn verify_count(&self, table: &str, expected: usize) -> Result<()> {
    let actual: i64 =
      self
        .conn
        .query_row(&format!("SELECT count(*) FROM {}", quote(table)), [], |r| r.get(0))?;
    let actual = usize::try_from(actual).unwrap_or_default();
    if actual != expected {
      return Err(Error::RowCountMismatch { table: table.to_owned(), expected, actual });
    }
    Ok(())
  }

  /// Step 4: one set-based insert from `staging` into `dest`. Returns the
  /// number of rows inserted or updated.
  pub fn merge<S: AsRef<str>>(
    &self,
    staging: &str,
    dest: &str,
    key: &[&str],
    columns: &[S],
    conflict: Conflict,
  ) -> Result<usize> {
    let cols = columns.iter().map(|c| quote(c.as_ref())).collect::<Vec<_>>().join(", ");
    let keys = key.iter().map(|k| quote(k)).collect::<Vec<_>>().join(", ");
    let updates = columns
      .iter()
      .map(|c| c.as_ref())
      .filter(|c| !key.contains(c))
      .map(|c| format!("{q} = excluded.{q}", q = quote(c)))
      .collect::<Vec<_>>();

    let clause = match conflict {
      Conflict::Append => String::new(),
      Conflict::UpdateAll if !updates.is_empty() => {
        format!(" ON CONFLICT ({keys}) DO UPDATE SET {}", updates.join(", "))
      }
      Conflict::DoNothing | Conflict::UpdateAll => format!(" ON CONFLICT ({keys}) DO NOTHING"),
    };

    // `WHERE true` keeps SQLite from reading ON CONFLICT as a join constraint.
    let sql = format!(
      "INSERT INTO {d} ({cols}) SELECT {cols} FROM {s} WHERE true{clause}",
      d = quote(dest),
      s = quote(staging),
    );
    let rows = self.conn.execute(&sql, [])?;
    debug!(table = dest, rows, ?conflict, "merged");
    Ok(rows)
  }

  /// Step 5.
  pub fn drop_staging(&self, staging: &str) -> Result<()> {
    self.conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(staging)))?;
    Ok(())
  }

  /// The full protocol for one table.
  pub fn upsert(&self, dest: &str, key: &[&str], data: &Table, conflict: Conflict) -> Result<usize> {
    let staging = self.stage(dest, data)?;
    let columns: Vec<&str> = data.column_names().collect();
    let rows = self.merge(&staging, dest, key, &columns, conflict)?;
    self.drop_staging(&staging)?;
    Ok(rows)
  }

  /// Compare staged parents with stored ones before they are merged. A parent
  /// counts as changed when it is not stored yet, when its stored `version`
  /// is null, or when the staged `version` is strictly greater.
  pub fn changed_parents(
    &self,
    staging: &str,
    dest: &str,
    key: &str,
    version: &str,
  ) -> Result<ChangedParents> {
    let table = staging_name(&format!("changed_{dest}"));
    self.conn.execute_batch(&format!(
      "DROP TABLE IF EXISTS {t};
       CREATE TABLE {t} AS
         SELECT s.{k} AS id
         FROM {s} AS s LEFT JOIN {d} AS d ON d.{k} = s.{k}
         WHERE d.{k} IS NULL OR d.{v} IS NULL OR d.{v} < s.{v};",
      t = quote(&table),
      s = quote(staging),
      d = quote(dest),
      k = quote(key),
      v = quote(version),
    ))?;

    let mut stmt = self.conn.prepare(&format!("SELECT id FROM {}", quote(&table)))?;
    let ids = stmt
      .query_map([], |r| r.get::<_, i64>(0))?
      .collect::<rusqlite::Result<HashSet<_>>>()?;
    debug!(table = dest, changed = ids.len(), "compared versions");
    Ok(ChangedParents { table, ids })
  }

  /// Replace the children of every changed parent: delete what is stored for
  /// them, then append the rows of `data` that belong to them. Rows of
  /// unchanged parents are not loaded.
  pub fn replace_children(
    &self,
    dest: &str,
    foreign_key: &str,
    changed: &ChangedParents,
    data: &Table,
  ) -> Result<usize> {
    let parents = data.values(foreign_key)?;
    let rows = data.filter_rows(|i| parents[i].as_i64().is_some_and(|id| changed.ids.contains(&id)));

    let deleted = self.conn.execute(
      &format!(
        "DELETE FROM {d} WHERE {fk} IN (SELECT id FROM {c})",
        d = quote(dest),
        fk = quote(foreign_key),
        c = quote(&changed.table),
      ),
      [],
    )?;
    let inserted = self.upsert(dest, &[], &rows, Conflict::Append)?;
    debug!(table = dest, deleted, inserted, skipped = data.len() - rows.len(), "replaced children");
    Ok(inserted)
  }
}
