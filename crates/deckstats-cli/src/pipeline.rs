//! One pipeline run: prepare → extract → transform → load, then reports.

use std::fmt;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use deckstats_aggregate::{AggregationEngine, ReportSink, Settings};
use deckstats_core::{
  store::{DeckStore, LoadSummary},
  table::Table,
};
use deckstats_extract::{Extractor, PageSource, Paginator, Preparer};
use deckstats_transform::Transformer;
use tracing::info;

use crate::PipelineConfig;

pub struct Pipeline<'a> {
  config: &'a PipelineConfig,
  test:   bool,
}

/// What a run fetched and stored, plus the normalized batch.
#[derive(Debug)]
pub struct Run {
  pub season_id: i64,
  pub since:     DateTime<Utc>,
  pub records:   usize,
  pub load:      LoadSummary,
  pub dataset:   Table,
}

impl<'a> Pipeline<'a> {
  pub fn new(config: &'a PipelineConfig, test: bool) -> Self { Self { config, test } }

  /// `seasons` serves the season-codes endpoint and `decks` the deck
  /// endpoint.
  pub async fn run<A, B, D>(&self, season_id: Option<i64>, seasons: A, decks: B, store: &D) -> anyhow::Result<Run>
  where
    A: PageSource,
    B: PageSource,
    D: DeckStore,
  {
    let prepared = Preparer::new(seasons, store)
      .execute(season_id)
      .await
      .context("preparing run")?;
    info!(
      season_id = prepared.season_id,
      since = %prepared.last_updated.format("%Y%m%d %H:%M:%S"),
      test = self.test,
      "running"
    );

    let paginator = Paginator::new(decks, self.config.page_size(self.test))
      .with_params([("seasonId", prepared.season_id), ("since", prepared.since())])
      .with_min_interval(self.config.min_interval())
      .with_retry_policy(self.config.retry_policy());
    let records = Extractor::new(paginator)
      .test_mode(self.test)
      .execute()
      .await
      .context("extracting decks")?;
    let fetched = records.len();
    info!(records = fetched, "extractor done");

    let raw = Table::from_records(records).context("building raw table")?;
    let dataset = Transformer::new(self.config.schema()?, self.config.steps())
      .execute(raw)
      .context("transforming decks")?;
    info!(rows = dataset.len(), columns = dataset.columns().len(), "transformer done");

    let load = store.load_dataset(&dataset).await.context("loading decks")?;
    info!("loader done");

    Ok(Run {
      season_id: prepared.season_id,
      since: prepared.last_updated,
      records: fetched,
      load,
      dataset,
    })
  }

  /// Recompute the configured reports from every stored deck of the run's
  /// season, not just the decks this run fetched.
  pub async fn report<D, K>(&self, run: &Run, store: &D, now: DateTime<Utc>, sink: &mut K) -> anyhow::Result<usize>
  where
    D: DeckStore,
    K: ReportSink,
  {
    let settings = Settings { win_rate_min_matches: self.config.win_rate_min_matches, now };
    let engine = match &self.config.reports {
      Some(names) => AggregationEngine::named(names, &settings)?,
      None => AggregationEngine::all(&settings),
    };
    let season = store
      .season_dataset(run.season_id)
      .await
      .context("reading season back")?;
    let written = engine.run(&season, sink).context("aggregating reports")?;
    info!(reports = written, "aggregations done");
    Ok(written)
  }
}

impl fmt::Display for Run {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "season {}: {} records since {}; {} decks stored ({} changed), {} people, {} archetypes, {} maindeck and {} sideboard entries",
      self.season_id,
      self.records,
      self.since.to_rfc3339(),
      self.load.decks,
      self.load.changed_decks,
      self.load.people,
      self.load.archetypes,
      self.load.maindecks,
      self.load.sideboards,
    )
  }
}
