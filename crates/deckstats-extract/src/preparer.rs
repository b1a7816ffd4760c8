//! [`Preparer`]: resolves the season to fetch and the incremental cut-off.

use chrono::{DateTime, TimeZone, Utc};
use deckstats_core::store::DeckStore;
use tracing::{info, warn};

use crate::{Error, Extractor, Paginator, Result, source::PageSource};

/// Cut-off used when a season has no stored decks yet; predates the first
/// season.
pub const SEASON_FLOOR: (i32, u32, u32) = (2016, 1, 1);

/// What the extractor should ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared {
  pub season_id:    i64,
  pub last_updated: DateTime<Utc>,
}

impl Prepared {
  /// The `since` query parameter: epoch seconds of `last_updated`.
  pub fn since(&self) -> i64 { self.last_updated.timestamp() }
}

pub struct Preparer<'a, S, D> {
  seasons: S,
  store:   &'a D,
}

impl<'a, S: PageSource, D: DeckStore> Preparer<'a, S, D> {
  /// `seasons` answers the season-codes endpoint; `store` holds the decks
  /// loaded by earlier runs.
  pub fn new(seasons: S, store: &'a D) -> Self { Self { seasons, store } }

  pub async fn execute(self, season_id: Option<i64>) -> Result<Prepared> {
    let store = self.store;
    let season_id = match season_id {
      Some(id) => id,
      None => self.infer_season_id().await?,
    };

    let stored = store
      .last_updated(season_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    let last_updated = match stored {
      Some(ts) => ts,
      None => {
        warn!(season_id, "no stored decks for season; fetching everything");
        floor()
      }
    };

    Ok(Prepared { season_id, last_updated })
  }

  /// The current season is the number of season codes published so far.
  async fn infer_season_id(self) -> Result<i64> {
    info!("season id not provided, counting seasons");
    let codes = Extractor::new(Paginator::new(self.seasons, 500)).execute().await?;
    Ok(codes.len() as i64)
  }
}

fn floor() -> DateTime<Utc> {
  let (y, m, d) = SEASON_FLOOR;
  Utc
    .with_ymd_and_hms(y, m, d, 0, 0, 0)
    .single()
    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;

  use deckstats_core::{
    deck::{Board, CardEntry},
    store::LoadSummary,
    table::Table,
  };
  use serde_json::json;

  use super::*;
  use crate::RawResponse;

  struct Codes;

  impl PageSource for Codes {
    async fn fetch(&self, _params: &[(String, String)]) -> Result<RawResponse> {
      Ok(RawResponse { status: 200, body: json!(["EMN", "KLD", "AER"]).to_string() })
    }
  }

  struct Stored(Option<DateTime<Utc>>);

  impl DeckStore for Stored {
    type Error = Infallible;

    async fn load_dataset(&self, _dataset: &Table) -> Result<LoadSummary, Infallible> {
      Ok(LoadSummary::default())
    }

    async fn last_updated(&self, _season_id: i64) -> Result<Option<DateTime<Utc>>, Infallible> {
      Ok(self.0)
    }

    async fn season_dataset(&self, _season_id: i64) -> Result<Table, Infallible> {
      Ok(Table::default())
    }

    async fn cards(&self, _deck_id: i64, _board: Board) -> Result<Vec<CardEntry>, Infallible> {
      Ok(Vec::new())
    }
  }

  #[tokio::test]
  async fn infers_season_from_code_count() {
    let store = Stored(None);
    let prepared = Preparer::new(Codes, &store).execute(None).await.unwrap();
    assert_eq!(prepared.season_id, 3);
    assert_eq!(prepared.last_updated, floor());
  }

  #[tokio::test]
  async fn uses_stored_cut_off() {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let store = Stored(Some(ts));
    let prepared = Preparer::new(Codes, &store).execute(Some(30)).await.unwrap();
    assert_eq!(prepared, Prepared { season_id: 30, last_updated: ts });
    assert_eq!(prepared.since(), 1_700_000_000);
  }
}
