//! [`JsonLinesWriter`]: writes reports as Hive-style partitioned JSON lines.
//!
//! A report named `r` partitioned by `a, b` lands in
//! `<root>/r/a=<value>/b=<value>/part.jsonl`, one JSON object per row holding
//! the non-partition columns. A write replaces the top-level partitions it
//! holds rows for (e.g. `seasonId=31`) and leaves every other partition of
//! the report in place.

use std::{
  collections::{BTreeMap, BTreeSet},
  fs::{self, File},
  io::{BufWriter, Write as _},
  path::{Path, PathBuf},
};

use deckstats_aggregate::{Report, ReportSink};
use deckstats_core::table::Value;
use thiserror::Error;
use tracing::debug;

/// Partition directory value used for null cells.
pub const NULL_PARTITION: &str = "__null__";

const PART_FILE: &str = "part.jsonl";

#[derive(Debug, Error)]
pub enum WriteError {
  #[error("io error at {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
  move |source| WriteError::Io { path: path.to_path_buf(), source }
}

pub struct JsonLinesWriter {
  root: PathBuf,
}

impl JsonLinesWriter {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }
}

/// `col=value` directory segment.
fn segment(column: &str, value: &Value) -> String {
  let rendered = match value {
    Value::Null => NULL_PARTITION.to_owned(),
    Value::Str(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Int(i) => i.to_string(),
    Value::Float(f) => f.to_string(),
    Value::Timestamp(t) => t.to_rfc3339(),
    Value::Json(j) => j.to_string(),
  };
  format!("{column}={}", rendered.replace(['/', '\\'], "_"))
}

impl ReportSink for JsonLinesWriter {
  type Error = WriteError;

  fn write(&mut self, report: &Report) -> Result<(), WriteError> {
    let base = self.root.join(&report.name);
    fs::create_dir_all(&base).map_err(io_err(&base))?;

    let table = &report.table;
    let partition: Vec<&str> = report
      .partition_by
      .iter()
      .map(String::as_str)
      .filter(|c| table.has_column(c))
      .collect();
    let payload: Vec<&str> = table.column_names().filter(|c| !partition.contains(c)).collect();

    let mut parts: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
    let mut touched: BTreeSet<PathBuf> = BTreeSet::new();
    for row in table.rows() {
      if let Some(top) = partition.first() {
        touched.insert(base.join(segment(top, row.get(top))));
      }
      let dir = partition
        .iter()
        .fold(base.clone(), |dir, c| dir.join(segment(c, row.get(c))));
      parts.entry(dir).or_default().push(row.index());
    }
    if parts.is_empty() {
      // Keep an empty file so readers see the report ran.
      parts.insert(base.clone(), Vec::new());
    }

    for dir in touched.iter().filter(|d| d.exists()) {
      fs::remove_dir_all(dir).map_err(io_err(dir))?;
    }

    for (dir, rows) in &parts {
      fs::create_dir_all(dir).map_err(io_err(dir))?;
      let path = dir.join(PART_FILE);
      let mut out = BufWriter::new(File::create(&path).map_err(io_err(&path))?);
      for &i in rows {
        let row = table.row(i);
        let object: serde_json::Map<String, serde_json::Value> = payload
          .iter()
          .map(|c| Ok(((*c).to_owned(), serde_json::to_value(row.get(c))?)))
          .collect::<Result<_, serde_json::Error>>()?;
        serde_json::to_writer(&mut out, &object)?;
        out.write_all(b"\n").map_err(io_err(&path))?;
      }
      out.flush().map_err(io_err(&path))?;
    }
    debug!(report = %report.name, partitions = parts.len(), rows = table.len(), "report written");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use deckstats_core::table::Table;

  use super::*;

  fn report(rows: &[(i64, Option<&str>, f64)]) -> Report {
    let mut table = Table::with_columns(&["seasonId", "archetypeName", "winRate"]);
    for (season, name, rate) in rows {
      table
        .push_row(vec![Value::Int(*season), Value::from(*name), Value::Float(*rate)])
        .unwrap();
    }
    Report {
      name: "archetype_win_rate".into(),
      partition_by: vec!["seasonId".into(), "archetypeName".into()],
      table,
    }
  }

  fn read(path: PathBuf) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
      .unwrap()
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect()
  }

  #[test]
  fn partitions_by_group_columns() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = JsonLinesWriter::new(dir.path());
    writer
      .write(&report(&[(30, Some("Burn"), 0.5), (30, Some("Burn"), 0.7), (30, None, 0.1)]))
      .unwrap();

    let base = dir.path().join("archetype_win_rate/seasonId=30");
    let burn = read(base.join("archetypeName=Burn").join(PART_FILE));
    assert_eq!(burn, [serde_json::json!({ "winRate": 0.5 }), serde_json::json!({ "winRate": 0.7 })]);
    assert_eq!(read(base.join("archetypeName=__null__").join(PART_FILE)).len(), 1);
  }

  #[test]
  fn other_seasons_survive_a_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = JsonLinesWriter::new(dir.path());
    writer.write(&report(&[(30, Some("Burn"), 0.5)])).unwrap();
    writer.write(&report(&[(31, Some("Burn"), 0.6)])).unwrap();

    let root = dir.path().join("archetype_win_rate");
    let season_30 = read(root.join("seasonId=30/archetypeName=Burn").join(PART_FILE));
    assert_eq!(season_30, [serde_json::json!({ "winRate": 0.5 })]);
    assert!(root.join("seasonId=31/archetypeName=Burn").join(PART_FILE).exists());
  }

  #[test]
  fn rewriting_a_season_drops_its_stale_groups() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = JsonLinesWriter::new(dir.path());
    writer.write(&report(&[(30, Some("Burn"), 0.5), (30, Some("Affinity"), 0.4)])).unwrap();
    writer.write(&report(&[(30, Some("Burn"), 0.55)])).unwrap();

    let season = dir.path().join("archetype_win_rate/seasonId=30");
    assert!(!season.join("archetypeName=Affinity").exists());
    let burn = read(season.join("archetypeName=Burn").join(PART_FILE));
    assert_eq!(burn, [serde_json::json!({ "winRate": 0.55 })]);
  }

  #[test]
  fn empty_report_keeps_published_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = JsonLinesWriter::new(dir.path());
    writer.write(&report(&[(30, Some("Burn"), 0.5)])).unwrap();
    writer.write(&report(&[])).unwrap();
    assert!(dir.path().join("archetype_win_rate/seasonId=30/archetypeName=Burn").exists());
  }

  #[test]
  fn empty_report_still_leaves_a_file() {
    let dir = tempfile::tempdir().unwrap();
    JsonLinesWriter::new(dir.path()).write(&report(&[])).unwrap();
    assert!(read(dir.path().join("archetype_win_rate").join(PART_FILE)).is_empty());
  }

  #[test]
  fn slashes_do_not_nest_directories() {
    assert_eq!(segment("archetypeName", &Value::from("U/R Tempo")), "archetypeName=U_R Tempo");
  }
}
