//! [`Transformer`]: enrichment steps, then schema casts, then projection.

use deckstats_core::table::{Table, Value};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  schema::{DType, Schema},
  steps::{Step, column},
};

pub struct Transformer {
  schema: Schema,
  steps:  Vec<Step>,
}

impl Transformer {
  pub fn new(schema: Schema, steps: Vec<Step>) -> Self { Self { schema, steps } }

  pub fn schema(&self) -> &Schema { &self.schema }

  /// Run every step in order, cast each schema column to its declared type,
  /// and return exactly the schema columns in schema order.
  ///
  /// An empty input yields an empty table with the schema's layout.
  pub fn execute(&self, mut table: Table) -> Result<Table> {
    if table.is_empty() {
      info!("no records to transform");
      return Ok(Table::with_columns(&self.schema.names()));
    }

    for step in &self.steps {
      debug!("running {}", step.describe());
      step.apply(&mut table)?;
    }

    for (name, spec) in self.schema.columns() {
      if spec.dtype == DType::Object {
        debug!(column = name, "keeping as object");
        continue;
      }
      debug!(column = name, dtype = %spec.dtype, "casting");
      let mut out_of_domain = 0usize;
      let values = column(&table, name)?
        .iter()
        .enumerate()
        .map(|(row, value)| {
          let cast = spec.dtype.cast(value.clone()).map_err(|()| Error::Coerce {
            row,
            column: name.to_owned(),
            value: format!("{value:?}"),
            dtype: spec.dtype.to_string(),
          })?;
          Ok(match (&spec.categories, cast) {
            (Some(domain), Value::Str(s)) if !domain.contains(&s) => {
              out_of_domain += 1;
              Value::Null
            }
            (_, cast) => cast,
          })
        })
        .collect::<Result<Vec<_>>>()?;
      if out_of_domain > 0 {
        warn!(column = name, count = out_of_domain, "values outside category domain set to null");
      }
      table.set_column(name, values)?;
    }

    let projected = table
      .select(&self.schema.names())
      .map_err(|e| match e {
        deckstats_core::Error::MissingColumn(c) => Error::MissingColumn(c),
        other => Error::Core(other),
      })?;
    info!(rows = projected.len(), columns = self.schema.len(), "transform done");
    Ok(projected)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use deckstats_core::deck::decks_from_table;
  use serde_json::json;

  use super::*;
  use crate::{ColumnSpec, deck_steps};

  fn raw_deck(id: i64) -> serde_json::Value {
    json!({
      "id": id,
      "name": "Burn",
      "seasonId": 30,
      "sourceName": "League",
      "person": "alice",
      "personId": 7,
      "archetypeName": null,
      "archetypeId": null,
      "colors": ["R", "W"],
      "createdDatetime": 1_700_000_000,
      "updatedDatetime": 1_700_090_000,
      "createdDate": 0,
      "updatedDate": 0,
      "url": "/decks/1/",
      "competitionId": 3,
      "finish": null,
      "retired": false,
      "wins": 3,
      "losses": 1,
      "draws": 0,
      "omw": "57%",
      "maindeck": [{ "n": 4, "name": "Lightning Bolt" }],
      "sideboard": [{ "n": 2, "name": "Smash to Smithereens" }],
      "extraneous": "dropped",
    })
  }

  fn transformer() -> Transformer {
    Transformer::new(Schema::decks().unwrap(), deck_steps("https://pennydreadfulmagic.com"))
  }

  fn run(records: Vec<serde_json::Value>) -> Result<Table> {
    transformer().execute(Table::from_records(records).unwrap())
  }

  #[test]
  fn normalizes_a_deck() {
    let table = run(vec![raw_deck(1)]).unwrap();
    let row = table.row(0);

    assert_eq!(row.get("matches"), &Value::Int(4));
    assert_eq!(row.get("archetypeId"), &Value::Int(-1));
    assert_eq!(row.get("archetypeName"), &Value::from("N/A"));
    assert_eq!(row.get("omwPercent"), &Value::Int(57));
    assert_eq!(row.get("url"), &Value::from("https://pennydreadfulmagic.com/decks/1/"));
    assert_eq!(row.get("colorHasR"), &Value::Bool(true));
    assert_eq!(row.get("colorHasU"), &Value::Bool(false));
    assert_eq!(
      row.get("createdDatetime"),
      &Value::Timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    );
    // The raw numeric date column is overwritten by the derived string.
    assert_eq!(row.get("createdDate"), &Value::from("20231114"));
    assert_eq!(row.get("finish"), &Value::Null);
  }

  #[test]
  fn output_is_exactly_the_schema() {
    let table = run(vec![raw_deck(1)]).unwrap();
    let schema = Schema::decks().unwrap();
    assert_eq!(table.column_names().collect::<Vec<_>>(), schema.names());
    assert!(!table.has_column("extraneous"));
    assert!(!table.has_column("omw"));
  }

  #[test]
  fn matches_is_the_sum_of_results() {
    let mut records = vec![raw_deck(1), raw_deck(2)];
    records[1]["wins"] = json!(0);
    records[1]["draws"] = json!(2);
    let decks = decks_from_table(&run(records).unwrap()).unwrap();
    assert!(decks.iter().all(|d| d.matches == d.wins + d.losses + d.draws));
    assert_eq!(decks[1].matches, 3);
  }

  #[test]
  fn out_of_domain_category_becomes_null() {
    let mut record = raw_deck(1);
    record["sourceName"] = json!("Tournament");
    let table = run(vec![record]).unwrap();
    assert_eq!(table.row(0).get("sourceName"), &Value::Null);
  }

  #[test]
  fn missing_schema_column_is_fatal() {
    let mut record = raw_deck(1);
    record.as_object_mut().unwrap().remove("competitionId");
    assert!(matches!(run(vec![record]), Err(Error::MissingColumn(c)) if c == "competitionId"));
  }

  #[test]
  fn failed_coercion_is_fatal() {
    let mut record = raw_deck(1);
    record["personId"] = json!("seven");
    assert!(matches!(run(vec![record]), Err(Error::Coerce { column, .. }) if column == "personId"));
  }

  #[test]
  fn empty_input_keeps_layout() {
    let table = run(Vec::new()).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.column_names().count(), Schema::decks().unwrap().len());
  }

  #[test]
  fn custom_schema_without_steps() {
    let mut schema = Schema::default();
    schema.push("b", ColumnSpec { dtype: DType::Float, categories: None });
    schema.push("a", ColumnSpec { dtype: DType::Object, categories: None });
    let table = Transformer::new(schema, Vec::new())
      .execute(Table::from_records(vec![json!({ "a": [1], "b": "2.5" })]).unwrap())
      .unwrap();
    assert_eq!(table.column_names().collect::<Vec<_>>(), ["b", "a"]);
    assert_eq!(table.row(0).get("b"), &Value::Float(2.5));
    assert_eq!(table.row(0).get("a"), &Value::Json(json!([1])));
  }
}
