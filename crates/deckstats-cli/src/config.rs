//! [`PipelineConfig`]: layered from an optional TOML file and `DECKSTATS_*`
//! environment variables.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use deckstats_extract::RetryPolicy;
use deckstats_transform::{Schema, Step, deck_steps};
use serde::Deserialize;

/// Environment variable prefix, e.g. `DECKSTATS_STORE_PATH`.
pub const ENV_PREFIX: &str = "DECKSTATS";

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
  /// Paginated deck endpoint.
  #[serde(default = "default_api_url")]
  pub api_url:              String,
  /// Season-codes endpoint, used when no season is given.
  #[serde(default = "default_season_url")]
  pub season_url:           String,
  /// Prefix for the relative deck URLs.
  #[serde(default = "default_base_url")]
  pub base_url:             String,
  #[serde(default)]
  pub headers:              BTreeMap<String, String>,
  /// Defaults to 500, or 10 in test mode.
  #[serde(default)]
  pub page_size:            Option<usize>,
  #[serde(default = "default_min_interval_ms")]
  pub min_interval_ms:      u64,
  /// Attempts per request before giving up.
  #[serde(default = "default_max_retries")]
  pub max_retries:          u32,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// JSON column schema; the built-in deck schema when unset.
  #[serde(default)]
  pub schema_path:          Option<PathBuf>,
  /// Enrichment steps; the standard deck steps when unset.
  #[serde(default)]
  pub steps:                Option<Vec<Step>>,
  /// Where reports are written. No reports are computed when unset.
  #[serde(default)]
  pub report_dir:           Option<PathBuf>,
  /// Report names to compute; all registered reports when unset.
  #[serde(default)]
  pub reports:              Option<Vec<String>>,
  #[serde(default = "default_win_rate_min_matches")]
  pub win_rate_min_matches: i64,
}

fn default_api_url() -> String { "https://pennydreadfulmagic.com/api/decks/".into() }
fn default_season_url() -> String { "https://pennydreadfulmagic.com/api/seasoncodes/".into() }
fn default_base_url() -> String { "https://pennydreadfulmagic.com".into() }
fn default_min_interval_ms() -> u64 { 500 }
fn default_max_retries() -> u32 { 7 }
fn default_store_path() -> PathBuf { PathBuf::from("deckstats.sqlite") }
fn default_win_rate_min_matches() -> i64 { 2 }

impl PipelineConfig {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise PipelineConfig")
  }

  pub fn page_size(&self, test: bool) -> usize {
    self.page_size.unwrap_or(if test { 10 } else { 500 })
  }

  pub fn min_interval(&self) -> Duration { Duration::from_millis(self.min_interval_ms) }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy { max_attempts: self.max_retries, ..RetryPolicy::default() }
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn schema(&self) -> anyhow::Result<Schema> {
    match &self.schema_path {
      None => Schema::decks().context("built-in deck schema"),
      Some(path) => {
        let path = expand_tilde(path);
        let raw = std::fs::read_to_string(&path)
          .with_context(|| format!("reading schema file {}", path.display()))?;
        Schema::from_json(&raw).with_context(|| format!("parsing schema file {}", path.display()))
      }
    }
  }

  pub fn steps(&self) -> Vec<Step> {
    self.steps.clone().unwrap_or_else(|| deck_steps(&self.base_url))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn load(toml: &str) -> PipelineConfig {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    PipelineConfig::load(file.path()).unwrap()
  }

  #[test]
  fn missing_file_gives_defaults() {
    let cfg = PipelineConfig::load(Path::new("/nonexistent/deckstats.toml")).unwrap();
    assert_eq!(cfg.page_size(false), 500);
    assert_eq!(cfg.page_size(true), 10);
    assert_eq!(cfg.min_interval(), Duration::from_millis(500));
    assert_eq!(cfg.retry_policy().max_attempts, 7);
    assert_eq!(cfg.win_rate_min_matches, 2);
    assert!(cfg.report_dir.is_none());
    assert_eq!(cfg.steps().len(), deck_steps(&cfg.base_url).len());
  }

  #[test]
  fn file_values_override_defaults() {
    let cfg = load(
      r#"
      page_size = 50
      max_retries = 3
      report_dir = "out"
      reports = ["archetype_day"]

      [headers]
      accept = "application/json"
      "#,
    );
    assert_eq!(cfg.page_size(true), 50);
    assert_eq!(cfg.retry_policy().max_attempts, 3);
    assert_eq!(cfg.report_dir, Some(PathBuf::from("out")));
    assert_eq!(cfg.reports.as_deref(), Some(&["archetype_day".to_owned()][..]));
    assert_eq!(cfg.headers.get("accept").map(String::as_str), Some("application/json"));
  }

  #[test]
  fn steps_can_be_configured() {
    let cfg = load(
      r#"
      [[steps]]
      name = "column_sum"
      sources = ["wins", "losses"]
      target = "decided"
      "#,
    );
    assert_eq!(cfg.steps().len(), 1);
    assert_eq!(cfg.steps()[0].target(), "decided");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }
}
