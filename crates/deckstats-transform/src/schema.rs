//! Declarative column schema: name → `{dtype, categories?}`, in order.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use deckstats_core::table::Value;
use serde::{
  Deserialize, Deserializer,
  de::{MapAccess, Visitor},
};
use strum::Display;

use crate::Result;

/// Embedded schema of the normalized deck dataset.
const DECK_SCHEMA: &str = include_str!("../deck_schema.json");

// ─── DType ───────────────────────────────────────────────────────────────────

/// Target type of a schema column. Accepts the numpy-style spellings used by
/// existing schema files as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DType {
  /// Kept exactly as received (nested lists, mixed values).
  Object,
  #[serde(alias = "int8", alias = "int16", alias = "int32", alias = "int64")]
  #[serde(alias = "Int8", alias = "Int16", alias = "Int32", alias = "Int64")]
  Int,
  #[serde(alias = "float32", alias = "float64", alias = "Float64")]
  Float,
  #[serde(alias = "boolean")]
  Bool,
  #[serde(alias = "str")]
  String,
  Category,
  #[serde(alias = "datetime64[ns]", alias = "datetime64[s]")]
  Datetime,
}

impl DType {
  /// Cast one non-null cell. `Err` carries nothing; the caller reports the
  /// offending value and position.
  pub fn cast(self, value: Value) -> Result<Value, ()> {
    if value.is_null() || matches!(value, Value::Float(f) if f.is_nan()) {
      return Ok(Value::Null);
    }
    match self {
      Self::Object => Ok(value),
      Self::Int => to_int(&value).map(Value::Int),
      Self::Float => to_float(&value).map(Value::Float),
      Self::Bool => to_bool(&value).map(Value::Bool),
      Self::String | Self::Category => to_string(value).map(Value::Str),
      Self::Datetime => to_datetime(&value).map(Value::Timestamp),
    }
  }
}

fn to_int(value: &Value) -> Result<i64, ()> {
  match value {
    Value::Int(i) => Ok(*i),
    Value::Bool(b) => Ok(i64::from(*b)),
    Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
    Value::Str(s) => {
      let s = s.trim();
      s.parse::<i64>()
        .or_else(|_| match s.parse::<f64>() {
          Ok(f) if f.fract() == 0.0 => Ok(f as i64),
          _ => Err(()),
        })
    }
    _ => Err(()),
  }
}

fn to_float(value: &Value) -> Result<f64, ()> {
  match value {
    Value::Int(i) => Ok(*i as f64),
    Value::Float(f) => Ok(*f),
    Value::Str(s) => s.trim().parse().map_err(|_| ()),
    _ => Err(()),
  }
}

fn to_bool(value: &Value) -> Result<bool, ()> {
  match value {
    Value::Bool(b) => Ok(*b),
    Value::Int(0) => Ok(false),
    Value::Int(1) => Ok(true),
    Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
      "true" | "1" => Ok(true),
      "false" | "0" => Ok(false),
      _ => Err(()),
    },
    _ => Err(()),
  }
}

fn to_string(value: Value) -> Result<String, ()> {
  Ok(match value {
    Value::Str(s) => s,
    Value::Int(i) => i.to_string(),
    Value::Float(f) => f.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Timestamp(t) => t.to_rfc3339(),
    Value::Json(j) => j.to_string(),
    Value::Null => return Err(()),
  })
}

/// Epoch seconds (integer, float or numeric string) or an RFC 3339 string.
pub(crate) fn to_datetime(value: &Value) -> Result<DateTime<Utc>, ()> {
  let from_secs = |secs: f64| {
    let whole = secs.floor() as i64;
    let nanos = ((secs - secs.floor()) * 1e9).round() as u32;
    // A fraction that rounds up to a full second carries into the seconds.
    let (whole, nanos) = if nanos >= 1_000_000_000 { (whole + 1, 0) } else { (whole, nanos) };
    Utc.timestamp_opt(whole, nanos).single().ok_or(())
  };
  match value {
    Value::Timestamp(t) => Ok(*t),
    Value::Int(i) => Utc.timestamp_opt(*i, 0).single().ok_or(()),
    Value::Float(f) => from_secs(*f),
    Value::Str(s) => {
      let s = s.trim();
      if let Ok(f) = s.parse::<f64>() {
        return from_secs(f);
      }
      DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ())
    }
    _ => Err(()),
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Declaration of one retained column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSpec {
  pub dtype:      DType,
  /// Allowed values of a categorical column; anything else becomes null.
  #[serde(default)]
  pub categories: Option<Vec<String>>,
}

/// Ordered mapping from column name to [`ColumnSpec`].
///
/// Deserialised from a JSON object; key order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
  columns: Vec<(String, ColumnSpec)>,
}

impl Schema {
  pub fn from_json(json: &str) -> Result<Self> { Ok(serde_json::from_str(json)?) }

  /// The schema of the normalized deck dataset.
  pub fn decks() -> Result<Self> { Self::from_json(DECK_SCHEMA) }

  pub fn push(&mut self, name: impl Into<String>, spec: ColumnSpec) {
    self.columns.push((name.into(), spec));
  }

  pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnSpec)> {
    self.columns.iter().map(|(n, s)| (n.as_str(), s))
  }

  pub fn names(&self) -> Vec<&str> { self.columns.iter().map(|(n, _)| n.as_str()).collect() }

  pub fn len(&self) -> usize { self.columns.len() }

  pub fn is_empty(&self) -> bool { self.columns.is_empty() }
}

impl<'de> Deserialize<'de> for Schema {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct SchemaVisitor;

    impl<'de> Visitor<'de> for SchemaVisitor {
      type Value = Schema;

      fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of column name to {dtype, categories?}")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Schema, A::Error> {
        let mut schema = Schema::default();
        while let Some((name, spec)) = map.next_entry::<String, ColumnSpec>()? {
          schema.push(name, spec);
        }
        Ok(schema)
      }
    }

    deserializer.deserialize_map(SchemaVisitor)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keeps_declaration_order() {
    let schema = Schema::from_json(
      r#"{ "zeta": {"dtype": "int"}, "alpha": {"dtype": "Int16"}, "mid": {"dtype": "object"} }"#,
    )
    .unwrap();
    assert_eq!(schema.names(), ["zeta", "alpha", "mid"]);
    assert!(schema.columns().all(|(_, s)| s.categories.is_none()));
  }

  #[test]
  fn reads_categories() {
    let schema = Schema::from_json(
      r#"{ "sourceName": {"dtype": "category", "categories": ["League", "Gatherling"]} }"#,
    )
    .unwrap();
    let (_, spec) = schema.columns().next().unwrap();
    assert_eq!(spec.dtype, DType::Category);
    assert_eq!(spec.categories.as_deref(), Some(&["League".to_owned(), "Gatherling".to_owned()][..]));
  }

  #[test]
  fn unknown_dtype_is_an_error() {
    assert!(Schema::from_json(r#"{ "x": {"dtype": "complex128"} }"#).is_err());
  }

  #[test]
  fn embedded_deck_schema_parses() {
    let schema = Schema::decks().unwrap();
    assert!(schema.names().contains(&"matches"));
    assert!(schema.names().contains(&"colorHasW"));
  }

  #[test]
  fn casts() {
    assert_eq!(DType::Int.cast(Value::from("57")), Ok(Value::Int(57)));
    assert_eq!(DType::Int.cast(Value::Float(3.0)), Ok(Value::Int(3)));
    assert_eq!(DType::Int.cast(Value::from("fifty")), Err(()));
    assert_eq!(DType::Int.cast(Value::Null), Ok(Value::Null));
    assert_eq!(DType::Float.cast(Value::Float(f64::NAN)), Ok(Value::Null));
    assert_eq!(DType::Bool.cast(Value::Int(1)), Ok(Value::Bool(true)));
    assert_eq!(DType::String.cast(Value::Int(4)), Ok(Value::from("4")));
    assert_eq!(
      DType::Datetime.cast(Value::Int(0)),
      Ok(Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH))
    );
  }

  #[test]
  fn fractions_rounding_to_a_whole_second_carry() {
    assert_eq!(
      DType::Datetime.cast(Value::Float(0.999_999_999_6)),
      Ok(Value::Timestamp(Utc.timestamp_opt(1, 0).unwrap()))
    );
    assert_eq!(
      DType::Datetime.cast(Value::from("1.5")),
      Ok(Value::Timestamp(Utc.timestamp_opt(1, 500_000_000).unwrap()))
    );
  }
}
