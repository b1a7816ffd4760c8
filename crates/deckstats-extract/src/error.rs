//! Error type for `deckstats-extract`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("invalid header {name:?}: {message}")]
  Header { name: String, message: String },

  /// A non-retryable status, or a retryable one that outlived every retry.
  #[error("request failed with status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A follow-up page did not have the `{total, objects}` shape.
  #[error("malformed pagination envelope on page {page}")]
  Envelope { page: usize },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
