//! `archetype_day`: distinct players per archetype per calendar day.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike as _, NaiveDate, Utc};
use deckstats_core::{
  deck::{Deck, col},
  table::{Table, Value},
};
use tracing::debug;

use crate::{
  Result,
  group::{GroupKey, tagged},
  registry::Aggregator,
};

/// Group key plus the day as `YYYYMMDD`, ordered like the output columns.
type DayKey = (i64, String, i64, i64, String);

/// `YYYYMMDD` as an integer.
fn day_number(day: NaiveDate) -> i64 {
  i64::from(day.year()) * 10_000 + i64::from(day.month()) * 100 + i64::from(day.day())
}

/// Every calendar day from `from` to `to`, both included.
fn days(from: DateTime<Utc>, to: DateTime<Utc>) -> impl Iterator<Item = NaiveDate> {
  let last = to.date_naive();
  from.date_naive().iter_days().take_while(move |d| *d <= last)
}

pub struct DayAggregator {
  now: DateTime<Utc>,
}

impl DayAggregator {
  pub const NAME: &'static str = "archetype_day";

  /// `now` stands in for decks that were never updated.
  pub fn new(now: DateTime<Utc>) -> Self { Self { now } }
}

impl Aggregator for DayAggregator {
  fn name(&self) -> &'static str { Self::NAME }

  fn group_by(&self) -> Vec<&'static str> {
    vec![col::SEASON_ID, col::SOURCE_NAME, "date", col::ARCHETYPE_ID, col::ARCHETYPE_NAME]
  }

  fn execute(&self, decks: &[Deck]) -> Result<Table> {
    let mut players: BTreeMap<DayKey, HashSet<i64>> = BTreeMap::new();
    let mut undated = 0usize;

    for (source, deck) in tagged(decks).filter(|(_, d)| d.matches > 0) {
      let Some(key) = GroupKey::of(source, deck) else { continue };
      let Some(created) = deck.created else {
        undated += 1;
        continue;
      };
      let updated = deck.updated.unwrap_or(self.now);
      for day in days(created, updated) {
        let people = players
          .entry((
            key.season_id,
            key.source_name.clone(),
            day_number(day),
            key.archetype_id,
            key.archetype_name.clone(),
          ))
          .or_default();
        people.extend(deck.person_id);
      }
    }
    if undated > 0 {
      debug!(undated, "decks without a creation time left out");
    }

    let mut columns = self.group_by();
    columns.push("players");
    let mut out = Table::with_columns(&columns);
    for ((season, source, date, archetype_id, archetype_name), people) in players {
      out.push_row(vec![
        Value::Int(season),
        Value::from(source),
        Value::Int(date),
        Value::Int(archetype_id),
        Value::from(archetype_name),
        Value::Int(people.len() as i64),
      ])?;
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::testutil::{deck, noon};

  fn league_rows(table: &Table) -> Vec<(i64, i64)> {
    table
      .rows()
      .filter(|r| r.get("sourceName").as_str() == Some("League"))
      .map(|r| (r.get("date").as_i64().unwrap(), r.get("players").as_i64().unwrap()))
      .collect()
  }

  #[test]
  fn spreads_decks_over_their_active_days() {
    let mut long = deck(1, "League", 3, 1);
    long.updated = Some(noon(3));
    let short = deck(2, "League", 1, 0);
    let table = DayAggregator::new(noon(10)).execute(&[long, short]).unwrap();

    assert_eq!(league_rows(&table), [(20240301, 2), (20240302, 1), (20240303, 1)]);
    assert_eq!(table.column_names().collect::<Vec<_>>(), [
      "seasonId",
      "sourceName",
      "date",
      "archetypeId",
      "archetypeName",
      "players"
    ]);
  }

  #[test]
  fn one_player_counts_once_per_day() {
    let mut second = deck(2, "League", 2, 2);
    second.person_id = Some(1);
    let table = DayAggregator::new(noon(10)).execute(&[deck(1, "League", 3, 1), second]).unwrap();
    assert_eq!(league_rows(&table), [(20240301, 1)]);
  }

  #[test]
  fn missing_update_runs_until_now() {
    let mut open = deck(1, "League", 1, 0);
    open.updated = None;
    let now = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();
    let table = DayAggregator::new(now).execute(&[open]).unwrap();
    assert_eq!(league_rows(&table), [(20240301, 1), (20240302, 1)]);
  }

  #[test]
  fn decks_without_matches_do_not_take_part() {
    let table = DayAggregator::new(noon(10)).execute(&[deck(1, "League", 0, 0)]).unwrap();
    assert!(table.is_empty());
    assert!(table.has_column("players"));
  }
}
