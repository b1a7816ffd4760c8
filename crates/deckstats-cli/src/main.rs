//! `deckstats`: harvest deck records for a season, store them, and write
//! archetype reports.
//!
//! # Usage
//!
//! ```text
//! deckstats                # current season
//! deckstats 31 --test      # season 31, first page only, debug logs
//! deckstats --config /etc/deckstats.toml
//! ```
//!
//! Failures are logged and notified; the process still exits successfully so
//! a scheduler does not crash-loop it.

use std::{path::PathBuf, time::Instant};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use deckstats_cli::{JsonLinesWriter, LogNotifier, Notifier, Pipeline, PipelineConfig, Run};
use deckstats_extract::HttpSource;
use deckstats_store_sqlite::SqliteStore;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deckstats", version, about = "Harvest deck records and build archetype reports")]
struct Cli {
  /// Season to fetch. Defaults to the current season.
  #[arg(value_name = "SEASON_ID")]
  season_id: Option<i64>,

  /// Test mode: small pages, first page only, debug logging.
  #[arg(long)]
  test: bool,

  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "deckstats.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.test { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .init();

  let notifier = LogNotifier;
  let started = Instant::now();
  match run(&cli).await {
    Ok(run) => notifier.notify("deckstats run succeeded", &run.to_string()),
    Err(e) => {
      error!("run failed: {e:#}");
      notifier.notify("deckstats run failed", &format!("{e:?}"));
    }
  }
  info!("time taken: {:?}", started.elapsed());

  Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<Run> {
  let config = PipelineConfig::load(&cli.config)?;

  let store_path = config.store_path();
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create store directory {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let seasons = HttpSource::new(&config.season_url, &config.headers).context("season source")?;
  let decks = HttpSource::new(&config.api_url, &config.headers).context("deck source")?;

  let pipeline = Pipeline::new(&config, cli.test);
  let run = pipeline.run(cli.season_id, seasons, decks, &store).await?;

  match &config.report_dir {
    Some(dir) => {
      let mut writer = JsonLinesWriter::new(deckstats_cli::config::expand_tilde(dir));
      pipeline.report(&run, &store, Utc::now(), &mut writer).await?;
    }
    None => info!("no report_dir configured; skipping reports"),
  }

  Ok(run)
}
