//! Error types for `deckstats-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("column not found: {0:?}")]
  MissingColumn(String),

  #[error("column {column:?} has {actual} values, table has {expected} rows")]
  LengthMismatch {
    column:   String,
    expected: usize,
    actual:   usize,
  },

  #[error("record {0} is not a JSON object")]
  NotARecord(usize),

  #[error("row {row}, column {column:?}: {message}")]
  InvalidValue {
    row:     usize,
    column:  String,
    message: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
