//! Error type for `deckstats-transform`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] deckstats_core::Error),

  #[error("schema error: {0}")]
  Schema(#[from] serde_json::Error),

  /// A column named by the schema or a step is absent from the input.
  #[error("column not found: {0:?}")]
  MissingColumn(String),

  #[error("row {row}, column {column:?}: cannot coerce {value} to {dtype}")]
  Coerce {
    row:    usize,
    column: String,
    value:  String,
    dtype:  String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
