//! Error type for `deckstats-aggregate`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] deckstats_core::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("no report registered as {0:?}")]
  UnknownReport(String),

  #[error("report sink failed on {report}: {source}")]
  Sink {
    report: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
