//! [`Paginator`]: page-by-page reads of a `{total, objects}` resource.
//!
//! The page index is owned here: any caller-supplied `page` parameter is
//! dropped, `pageSize` is injected, and pages are requested in strictly
//! increasing order until the total reported by the first page is covered.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  source::{PageSource, Params, RawResponse},
};

/// Statuses that mean "come back later": too-many-requests,
/// service-unavailable and gateway-timeout.
pub const RETRYABLE_STATUSES: [u16; 3] = [429, 503, 504];

const PAGE_PARAM: &str = "page";
const PAGE_SIZE_PARAM: &str = "pageSize";

// ─── Retry policy ────────────────────────────────────────────────────────────

/// Exponential backoff for retryable statuses.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Wait before the first retry.
  pub initial_wait:   Duration,
  /// Total attempts per request, including the first one. At least 1.
  pub max_attempts:   u32,
  /// Multiplier applied to the wait after each retry. Greater than 1.
  pub backoff_factor: u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      initial_wait:   Duration::from_millis(500),
      max_attempts:   7,
      backoff_factor: 2,
    }
  }
}

// ─── Paginator ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
  total:   u64,
  objects: Vec<serde_json::Value>,
}

/// Rate-limited, retrying reader of one paginated resource.
pub struct Paginator<S> {
  source:       S,
  params:       Params,
  min_interval: Duration,
  retry:        RetryPolicy,
}

impl<S: PageSource> Paginator<S> {
  pub fn new(source: S, page_size: usize) -> Self {
    Self {
      source,
      params: vec![(PAGE_SIZE_PARAM.to_owned(), page_size.to_string())],
      min_interval: Duration::from_millis(500),
      retry: RetryPolicy::default(),
    }
  }

  /// Add query parameters (domain filters such as `seasonId` or `since`).
  /// `page` is ignored; `pageSize` overrides the constructor's page size.
  pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: Into<String>,
    V: ToString,
  {
    for (key, value) in params {
      let key = key.into();
      if key == PAGE_PARAM {
        continue;
      }
      self.params.retain(|(k, _)| *k != key);
      self.params.push((key, value.to_string()));
    }
    self
  }

  /// Minimum spacing between the end of one page request and the start of
  /// the next.
  pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
    self.min_interval = min_interval;
    self
  }

  pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
    self.retry = RetryPolicy {
      max_attempts: retry.max_attempts.max(1),
      backoff_factor: retry.backoff_factor.max(2),
      ..retry
    };
    self
  }

  pub fn params(&self) -> &[(String, String)] { &self.params }

  /// Start a fresh pass over the resource. Each pass re-fetches from page 0.
  pub fn pages(&self) -> Pages<'_, S> {
    Pages { paginator: self, params: self.params.clone(), state: State::Start }
  }

  /// GET with exponential backoff on [`RETRYABLE_STATUSES`]. The last
  /// response is returned as-is once it is a 200, a non-retryable status, or
  /// the attempts are spent.
  async fn get_or_retry(&self, params: &[(String, String)]) -> Result<RawResponse> {
    let mut wait = self.retry.initial_wait;
    let mut attempt = 1;
    loop {
      let response = self.source.fetch(params).await?;
      if response.status == 200 {
        return Ok(response);
      }
      debug!(status = response.status, body = response.body.trim(), "non-200 response");
      if !RETRYABLE_STATUSES.contains(&response.status) || attempt >= self.retry.max_attempts {
        return Ok(response);
      }
      warn!(
        status = response.status,
        attempt,
        wait_ms = wait.as_millis() as u64,
        "retryable status; backing off"
      );
      sleep(wait).await;
      wait *= self.retry.backoff_factor;
      attempt += 1;
    }
  }
}

fn ensure_ok(response: RawResponse) -> Result<RawResponse> {
  if response.status == 200 {
    Ok(response)
  } else {
    Err(Error::Status { status: response.status, body: response.body })
  }
}

// ─── Page sequence ───────────────────────────────────────────────────────────

enum State {
  Start,
  Paging {
    next:        usize,
    total_pages: usize,
    last_call:   Instant,
  },
  Done,
}

/// One pass over a paginated resource. Call [`Pages::next`] until it returns
/// `None`; an error ends the pass.
pub struct Pages<'a, S> {
  paginator: &'a Paginator<S>,
  params:    Params,
  state:     State,
}

impl<S: PageSource> Pages<'_, S> {
  /// The next page of raw records, or `None` once the source total is covered.
  pub async fn next(&mut self) -> Result<Option<Vec<serde_json::Value>>> {
    let result = match self.state {
      State::Start => self.first_page().await,
      State::Paging { next, total_pages, last_call } => {
        self.follow_up_page(next, total_pages, last_call).await
      }
      State::Done => return Ok(None),
    };
    if result.is_err() {
      self.state = State::Done;
    }
    result.map(Some)
  }

  async fn first_page(&mut self) -> Result<Vec<serde_json::Value>> {
    let mut response = self.paginator.get_or_retry(&self.params).await?;
    if response.status != 200 {
      warn!(status = response.status, "first page failed; retrying without pageSize");
      self.params.retain(|(k, _)| k != PAGE_SIZE_PARAM);
      response = ensure_ok(self.paginator.get_or_retry(&self.params).await?)?;
    }
    let last_call = Instant::now();

    let json: serde_json::Value = serde_json::from_str(&response.body)?;
    let is_envelope = json
      .as_object()
      .is_some_and(|o| o.contains_key("total") && o.contains_key("objects"));
    if !is_envelope {
      self.state = State::Done;
      return Ok(match json {
        serde_json::Value::Array(items) => items,
        other => vec![other],
      });
    }

    let envelope: Envelope =
      serde_json::from_value(json).map_err(|_| Error::Envelope { page: 0 })?;
    info!(total = envelope.total, "objects found");

    let per_page = envelope.objects.len() as u64;
    let total_pages = if per_page == 0 { 1 } else { envelope.total.div_ceil(per_page) as usize };
    info!("Yielding page 1/{total_pages}");

    self.state = if total_pages > 1 {
      State::Paging { next: 1, total_pages, last_call }
    } else {
      State::Done
    };
    Ok(envelope.objects)
  }

  async fn follow_up_page(
    &mut self,
    page: usize,
    total_pages: usize,
    last_call: Instant,
  ) -> Result<Vec<serde_json::Value>> {
    let elapsed = last_call.elapsed();
    if elapsed < self.paginator.min_interval {
      sleep(self.paginator.min_interval - elapsed).await;
    }

    self.params.retain(|(k, _)| k != PAGE_PARAM);
    self.params.push((PAGE_PARAM.to_owned(), page.to_string()));

    let response = ensure_ok(self.paginator.get_or_retry(&self.params).await?)?;
    let last_call = Instant::now();
    let envelope: Envelope =
      serde_json::from_str(&response.body).map_err(|_| Error::Envelope { page })?;

    info!("Yielding page {}/{total_pages}", page + 1);
    self.state = if page + 1 < total_pages {
      State::Paging { next: page + 1, total_pages, last_call }
    } else {
      State::Done
    };
    Ok(envelope.objects)
  }
}
