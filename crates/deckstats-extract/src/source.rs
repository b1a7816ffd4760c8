//! The transport seam under the paginator.

use std::{collections::BTreeMap, future::Future, time::Duration};

use reqwest::{
  Client,
  header::{HeaderMap, HeaderName, HeaderValue},
};

use crate::{Error, Result};

/// Ordered query parameters.
pub type Params = Vec<(String, String)>;

/// Status and body of one GET, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub body:   String,
}

/// Something that can answer a GET for the paginated resource.
///
/// [`HttpSource`] is the real implementation; tests script responses.
pub trait PageSource: Send + Sync {
  fn fetch<'a>(
    &'a self,
    params: &'a [(String, String)],
  ) -> impl Future<Output = Result<RawResponse>> + Send + 'a;
}

impl<T: PageSource> PageSource for &T {
  fn fetch<'a>(
    &'a self,
    params: &'a [(String, String)],
  ) -> impl Future<Output = Result<RawResponse>> + Send + 'a {
    (**self).fetch(params)
  }
}

/// GETs a fixed URL with static headers over [`reqwest`].
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpSource {
  client:  Client,
  url:     String,
  headers: HeaderMap,
}

impl HttpSource {
  pub fn new(url: impl Into<String>, headers: &BTreeMap<String, String>) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    let mut map = HeaderMap::new();
    for (name, value) in headers {
      let header_err = |message: String| Error::Header { name: name.clone(), message };
      let key = HeaderName::from_bytes(name.as_bytes()).map_err(|e| header_err(e.to_string()))?;
      let val = HeaderValue::from_str(value).map_err(|e| header_err(e.to_string()))?;
      map.insert(key, val);
    }

    Ok(Self { client, url: url.into(), headers: map })
  }

  pub fn url(&self) -> &str { &self.url }
}

impl PageSource for HttpSource {
  fn fetch<'a>(
    &'a self,
    params: &'a [(String, String)],
  ) -> impl Future<Output = Result<RawResponse>> + Send + 'a {
    async move {
      let resp = self
        .client
        .get(&self.url)
        .headers(self.headers.clone())
        .query(params)
        .send()
        .await?;
      let status = resp.status().as_u16();
      let body = resp.text().await?;
      Ok(RawResponse { status, body })
    }
  }
}
