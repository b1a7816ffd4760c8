//! [`Extractor`]: drains a [`Paginator`] into one flat list of records.

use tracing::info;

use crate::{Paginator, Result, source::PageSource};

pub struct Extractor<S> {
  paginator: Paginator<S>,
  /// Stop after the first page.
  test:      bool,
}

impl<S: PageSource> Extractor<S> {
  pub fn new(paginator: Paginator<S>) -> Self { Self { paginator, test: false } }

  pub fn test_mode(mut self, test: bool) -> Self {
    self.test = test;
    self
  }

  pub async fn execute(&self) -> Result<Vec<serde_json::Value>> {
    info!(params = ?self.paginator.params(), test = self.test, "start fetching");
    let mut objects = Vec::new();
    let mut pages = self.paginator.pages();
    while let Some(page) = pages.next().await? {
      objects.extend(page);
      if self.test {
        break;
      }
    }
    info!(records = objects.len(), "fetching done");
    Ok(objects)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use serde_json::json;

  use super::*;
  use crate::{RawResponse, source::PageSource};

  struct TwoPages(Mutex<Vec<serde_json::Value>>);

  impl PageSource for TwoPages {
    async fn fetch(&self, _params: &[(String, String)]) -> Result<RawResponse> {
      let body = self.0.lock().unwrap().remove(0).to_string();
      Ok(RawResponse { status: 200, body })
    }
  }

  fn source() -> TwoPages {
    TwoPages(Mutex::new(vec![
      json!({ "total": 3, "objects": [{ "id": 1 }, { "id": 2 }] }),
      json!({ "total": 3, "objects": [{ "id": 3 }] }),
    ]))
  }

  #[tokio::test(start_paused = true)]
  async fn flattens_every_page() {
    let records = Extractor::new(Paginator::new(source(), 2)).execute().await.unwrap();
    assert_eq!(records, [json!({ "id": 1 }), json!({ "id": 2 }), json!({ "id": 3 })]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_mode_stops_after_first_page() {
    let records = Extractor::new(Paginator::new(source(), 2))
      .test_mode(true)
      .execute()
      .await
      .unwrap();
    assert_eq!(records.len(), 2);
  }
}
