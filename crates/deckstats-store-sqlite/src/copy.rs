//! Bulk copy of a [`Table`] through a tab-separated text stream.
//!
//! [`write_table`] renders rows in `COPY … FORMAT text` layout; [`copy_in`]
//! reads such a stream back and inserts it through one prepared statement.

use std::io::{BufRead, Write};

use deckstats_core::table::Table;
use rusqlite::{Connection, params_from_iter};

use crate::{
  Error, Result,
  encode::{decode_cell, encode_cell},
};

/// Double-quote an identifier for interpolation into SQL.
pub fn quote(ident: &str) -> String { format!("\"{}\"", ident.replace('"', "\"\"")) }

/// Write every row of `table` as one line of tab-separated cells.
pub fn write_table<W: Write>(table: &Table, mut out: W) -> Result<()> {
  let mut line = String::new();
  for row in table.rows() {
    line.clear();
    for (i, value) in row.values().enumerate() {
      if i > 0 {
        line.push('\t');
      }
      encode_cell(value, &mut line)?;
    }
    line.push('\n');
    out.write_all(line.as_bytes())?;
  }
  out.flush()?;
  Ok(())
}

/// Insert every line of `input` into `columns` of `table`. Returns the number
/// of rows inserted.
pub fn copy_in<R: BufRead, S: AsRef<str>>(
  conn: &Connection,
  table: &str,
  columns: &[S],
  input: R,
) -> Result<usize> {
  let names = columns.iter().map(|c| quote(c.as_ref())).collect::<Vec<_>>();
  let placeholders = (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>();
  let sql = format!(
    "INSERT INTO {} ({}) VALUES ({})",
    quote(table),
    names.join(", "),
    placeholders.join(", "),
  );
  let mut stmt = conn.prepare(&sql)?;

  let mut rows = 0;
  for (line_no, line) in input.lines().enumerate() {
    let line = line?;
    let fields: Vec<Option<String>> = line.split('\t').map(decode_cell).collect();
    if fields.len() != columns.len() {
      return Err(Error::CopyFormat {
        line:     line_no + 1,
        expected: columns.len(),
        actual:   fields.len(),
      });
    }
    stmt.execute(params_from_iter(fields))?;
    rows += 1;
  }
  Ok(rows)
}
