//! Error type for `deckstats-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] deckstats_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A line of the bulk-copy stream did not match the staged column list.
  #[error("copy stream line {line}: expected {expected} fields, got {actual}")]
  CopyFormat {
    line:     usize,
    expected: usize,
    actual:   usize,
  },

  /// The staging table does not hold exactly the rows that were streamed in.
  #[error("staging table {table} holds {actual} rows, expected {expected}")]
  RowCountMismatch {
    table:    String,
    expected: usize,
    actual:   usize,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
