//! [`AggregationEngine`]: runs reports and hands them to a [`ReportSink`].

use std::convert::Infallible;

use deckstats_core::{deck::decks_from_table, table::Table};
use tracing::info;

use crate::{
  Error, Result,
  registry::{Aggregator, REPORTS, Settings, lookup},
};

/// One computed report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
  pub name:         String,
  /// Grouping columns of `table`, for partitioned writers.
  pub partition_by: Vec<String>,
  pub table:        Table,
}

/// Destination for computed reports, e.g. a file writer.
pub trait ReportSink {
  type Error: std::error::Error + Send + Sync + 'static;

  fn write(&mut self, report: &Report) -> Result<(), Self::Error>;
}

/// Collects reports in memory.
impl ReportSink for Vec<Report> {
  type Error = Infallible;

  fn write(&mut self, report: &Report) -> Result<(), Infallible> {
    self.push(report.clone());
    Ok(())
  }
}

pub struct AggregationEngine {
  aggregators: Vec<Box<dyn Aggregator>>,
}

impl AggregationEngine {
  pub fn new(aggregators: Vec<Box<dyn Aggregator>>) -> Self { Self { aggregators } }

  /// Every registered report.
  pub fn all(settings: &Settings) -> Self {
    Self::new(REPORTS.iter().map(|r| (r.build)(settings)).collect())
  }

  /// The named reports, in the given order.
  pub fn named<S: AsRef<str>>(names: &[S], settings: &Settings) -> Result<Self> {
    let aggregators = names
      .iter()
      .map(|name| {
        let name = name.as_ref();
        lookup(name)
          .map(|r| (r.build)(settings))
          .ok_or_else(|| Error::UnknownReport(name.to_owned()))
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Self::new(aggregators))
  }

  pub fn names(&self) -> Vec<&'static str> { self.aggregators.iter().map(|a| a.name()).collect() }

  /// Compute every report over `dataset` and write each to `sink` as soon as
  /// it is ready. Returns the number of reports written.
  pub fn run<K: ReportSink>(&self, dataset: &Table, sink: &mut K) -> Result<usize> {
    let decks = decks_from_table(dataset)?;
    for aggregator in &self.aggregators {
      let name = aggregator.name();
      info!(report = name, decks = decks.len(), "aggregating");
      let report = Report {
        name:         name.to_owned(),
        partition_by: aggregator.group_by().into_iter().map(str::to_owned).collect(),
        table:        aggregator.execute(&decks)?,
      };
      info!(report = name, rows = report.table.len(), "report ready");
      sink.write(&report).map_err(|e| Error::Sink { report: name.to_owned(), source: Box::new(e) })?;
    }
    Ok(self.aggregators.len())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use deckstats_core::table::Value;
  use serde_json::json;

  use super::*;

  fn dataset() -> Table {
    let deck = |id: i64, source: &str, wins: i64, losses: i64| {
      json!({
        "id": id, "seasonId": 30, "sourceName": source, "personId": id,
        "archetypeId": -1, "archetypeName": "N/A",
        "wins": wins, "losses": losses, "draws": 0, "matches": wins + losses,
        "maindeck": [{ "n": 4, "name": "Lightning Bolt" }], "sideboard": null,
      })
    };
    Table::from_records(vec![deck(1, "League", 3, 1), deck(2, "Gatherling", 1, 1)]).unwrap()
  }

  #[test]
  fn runs_every_registered_report() {
    let mut sink: Vec<Report> = Vec::new();
    let written = AggregationEngine::all(&Settings::new(Utc::now())).run(&dataset(), &mut sink).unwrap();

    assert_eq!(written, REPORTS.len());
    let names: Vec<&str> = sink.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, REPORTS.iter().map(|r| r.name).collect::<Vec<_>>());

    let win_rate = &sink[0];
    assert_eq!(win_rate.partition_by, ["seasonId", "sourceName", "archetypeId", "archetypeName"]);
    let both = win_rate.table.row(0);
    assert_eq!(both.get("sourceName"), &Value::from("Both"));
    assert_eq!(both.get("archetypeId"), &Value::Int(-1));
    assert_eq!(both.get("winRate"), &Value::Float(0.75));
  }

  #[test]
  fn unknown_names_are_rejected() {
    let settings = Settings::new(Utc::now());
    assert!(matches!(
      AggregationEngine::named(&["archetype_win_rate", "nope"], &settings),
      Err(Error::UnknownReport(n)) if n == "nope"
    ));
    let engine = AggregationEngine::named(&["archetype_day"], &settings).unwrap();
    assert_eq!(engine.names(), ["archetype_day"]);
  }

  #[test]
  fn sink_failures_name_the_report() {
    struct Broken;
    impl ReportSink for Broken {
      type Error = std::io::Error;

      fn write(&mut self, _: &Report) -> Result<(), std::io::Error> { Err(std::io::Error::other("disk full")) }
    }

    let engine = AggregationEngine::named(&["average_archetype_deck"], &Settings::new(Utc::now())).unwrap();
    let err = engine.run(&dataset(), &mut Broken).unwrap_err();
    assert!(matches!(err, Error::Sink { report, .. } if report == "average_archetype_deck"));
  }
}
