//! Grouping decks by season, source tag and archetype.

use std::collections::BTreeMap;

use deckstats_core::{
  deck::{Deck, col},
  table::{Table, Value},
};
use tracing::debug;

/// Source tag of the synthetic copy every deck gets, so each report carries
/// per-source and combined-source rows.
pub const COMBINED_SOURCE: &str = "Both";

/// `(seasonId, sourceName, archetypeId, archetypeName)`; ordered the way
/// report rows are emitted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
  pub season_id:      i64,
  pub source_name:    String,
  pub archetype_id:   i64,
  pub archetype_name: String,
}

impl GroupKey {
  pub const COLUMNS: [&'static str; 4] =
    [col::SEASON_ID, col::SOURCE_NAME, col::ARCHETYPE_ID, col::ARCHETYPE_NAME];

  /// Key of `deck` under `source`; `None` when any component is null.
  pub fn of(source: Option<&str>, deck: &Deck) -> Option<Self> {
    Some(Self {
      season_id:      deck.season_id?,
      source_name:    source?.to_owned(),
      archetype_id:   deck.archetype_id?,
      archetype_name: deck.archetype_name.clone()?,
    })
  }

  pub fn values(&self) -> Vec<Value> {
    vec![
      Value::Int(self.season_id),
      Value::from(self.source_name.as_str()),
      Value::Int(self.archetype_id),
      Value::from(self.archetype_name.as_str()),
    ]
  }
}

/// Every deck twice: first under [`COMBINED_SOURCE`], then under its own tag.
pub(crate) fn tagged(decks: &[Deck]) -> impl Iterator<Item = (Option<&str>, &Deck)> {
  decks
    .iter()
    .map(|d| (Some(COMBINED_SOURCE), d))
    .chain(decks.iter().map(|d| (d.source_name.as_deref(), d)))
}

/// Decks passing `keep`, grouped by [`GroupKey`]. Within a group decks keep
/// their input order.
pub(crate) fn grouped<'d>(
  decks: &'d [Deck],
  keep: impl Fn(&Deck) -> bool,
) -> BTreeMap<GroupKey, Vec<&'d Deck>> {
  let mut groups: BTreeMap<GroupKey, Vec<&Deck>> = BTreeMap::new();
  let mut skipped = 0usize;
  for (source, deck) in tagged(decks).filter(|(_, d)| keep(d)) {
    match GroupKey::of(source, deck) {
      Some(key) => groups.entry(key).or_default().push(deck),
      None => skipped += 1,
    }
  }
  if skipped > 0 {
    debug!(skipped, "rows with a null group key left out");
  }
  groups
}

/// Empty report with the group columns followed by `extra`.
pub(crate) fn report_table(extra: &[&str]) -> Table {
  let mut columns: Vec<&str> = GroupKey::COLUMNS.to_vec();
  columns.extend_from_slice(extra);
  Table::with_columns(&columns)
}
