//! A small column-oriented dataset.
//!
//! Raw API records, normalized decks and report outputs all travel through the
//! pipeline as a [`Table`]: an ordered list of equally long named columns of
//! dynamically typed [`Value`]s.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Error, Result};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single dynamically typed cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  Timestamp(DateTime<Utc>),
  /// Nested structure kept verbatim (card lists, color lists).
  Json(serde_json::Value),
}

impl Value {
  /// Convert a raw JSON value into a cell. Scalars map onto their typed
  /// variants; arrays and objects stay as [`Value::Json`].
  pub fn from_json(v: serde_json::Value) -> Self {
    match v {
      serde_json::Value::Null => Self::Null,
      serde_json::Value::Bool(b) => Self::Bool(b),
      serde_json::Value::Number(n) => match n.as_i64() {
        Some(i) => Self::Int(i),
        None => n.as_f64().map_or(Self::Null, Self::Float),
      },
      serde_json::Value::String(s) => Self::Str(s),
      other => Self::Json(other),
    }
  }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(i) => Some(*i),
      Self::Bool(b) => Some(i64::from(*b)),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Int(i) => Some(*i as f64),
      Self::Float(f) => Some(*f),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Timestamp(t) => Some(*t),
      _ => None,
    }
  }

  fn key(&self) -> ValueKey {
    match self {
      Self::Null => ValueKey::Null,
      Self::Bool(b) => ValueKey::Bool(*b),
      Self::Int(i) => ValueKey::Int(*i),
      Self::Float(f) => ValueKey::Float(f.to_bits()),
      Self::Str(s) => ValueKey::Str(s.clone()),
      Self::Timestamp(t) => ValueKey::Timestamp(*t),
      Self::Json(j) => ValueKey::Json(j.to_string()),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Str(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Str(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// Hashable projection of a [`Value`], used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
  Null,
  Bool(bool),
  Int(i64),
  Float(u64),
  Str(String),
  Timestamp(DateTime<Utc>),
  Json(String),
}

// ─── Column / Table ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
  pub name:   String,
  pub values: Vec<Value>,
}

/// An ordered set of named columns, all of the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
  columns: Vec<Column>,
  len:     usize,
}

impl Table {
  /// An empty table with the given column layout and no rows.
  pub fn with_columns<S: AsRef<str>>(names: &[S]) -> Self {
    Self {
      columns: names
        .iter()
        .map(|n| Column { name: n.as_ref().to_owned(), values: Vec::new() })
        .collect(),
      len:     0,
    }
  }

  /// Build a table from a list of JSON objects. Columns appear in first-seen
  /// key order; a key absent from a record yields [`Value::Null`].
  pub fn from_records(records: Vec<serde_json::Value>) -> Result<Self> {
    let mut table = Self::default();
    for (i, record) in records.into_iter().enumerate() {
      let serde_json::Value::Object(map) = record else {
        return Err(Error::NotARecord(i));
      };
      for (key, value) in map {
        let idx = match table.position(&key) {
          Some(idx) => idx,
          None => {
            table.columns.push(Column { name: key, values: vec![Value::Null; i] });
            table.columns.len() - 1
          }
        };
        table.columns[idx].values.push(Value::from_json(value));
      }
      table.len = i + 1;
      for column in &mut table.columns {
        column.values.resize(table.len, Value::Null);
      }
    }
    Ok(table)
  }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  pub fn column_names(&self) -> impl Iterator<Item = &str> {
    self.columns.iter().map(|c| c.name.as_str())
  }

  pub fn columns(&self) -> &[Column] { &self.columns }

  pub fn has_column(&self, name: &str) -> bool { self.position(name).is_some() }

  fn position(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c.name == name)
  }

  /// Values of column `name`, or [`Error::MissingColumn`].
  pub fn values(&self, name: &str) -> Result<&[Value]> {
    self
      .position(name)
      .map(|i| self.columns[i].values.as_slice())
      .ok_or_else(|| Error::MissingColumn(name.to_owned()))
  }

  /// Replace column `name`, or append it if absent.
  pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
    if self.columns.is_empty() && self.len == 0 {
      self.len = values.len();
    }
    if values.len() != self.len {
      return Err(Error::LengthMismatch {
        column:   name.to_owned(),
        expected: self.len,
        actual:   values.len(),
      });
    }
    match self.position(name) {
      Some(i) => self.columns[i].values = values,
      None => self.columns.push(Column { name: name.to_owned(), values }),
    }
    Ok(())
  }

  /// A new table holding copies of the named columns, in the given order.
  pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
    let columns = names
      .iter()
      .map(|n| {
        let name = n.as_ref();
        self.values(name).map(|values| Column {
          name:   name.to_owned(),
          values: values.to_vec(),
        })
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Self { columns, len: self.len })
  }

  /// Rename columns in place; names not present are ignored.
  pub fn rename(&mut self, pairs: &[(&str, &str)]) {
    for (from, to) in pairs {
      if let Some(i) = self.position(from) {
        self.columns[i].name = (*to).to_owned();
      }
    }
  }

  pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
    if row.len() != self.columns.len() {
      return Err(Error::LengthMismatch {
        column:   "<row>".to_owned(),
        expected: self.columns.len(),
        actual:   row.len(),
      });
    }
    for (column, value) in self.columns.iter_mut().zip(row) {
      column.values.push(value);
    }
    self.len += 1;
    Ok(())
  }

  /// Keep only the rows whose index satisfies `keep`.
  pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
    let kept: Vec<usize> = (0..self.len).filter(|&i| keep(i)).collect();
    let columns = self
      .columns
      .iter()
      .map(|c| Column {
        name:   c.name.clone(),
        values: kept.iter().map(|&i| c.values[i].clone()).collect(),
      })
      .collect();
    Self { columns, len: kept.len() }
  }

  /// Drop rows whose `keys` columns repeat an earlier row; the first
  /// occurrence wins.
  pub fn drop_duplicates(&self, keys: &[&str]) -> Result<Self> {
    let key_columns = keys
      .iter()
      .map(|k| self.values(k))
      .collect::<Result<Vec<_>>>()?;
    let mut seen = HashSet::new();
    Ok(self.filter_rows(|i| {
      let key: Vec<ValueKey> = key_columns.iter().map(|c| c[i].key()).collect();
      seen.insert(key)
    }))
  }

  pub fn row(&self, index: usize) -> Row<'_> { Row { table: self, index } }

  pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
    (0..self.len).map(move |index| Row { table: self, index })
  }
}

// ─── Row view ────────────────────────────────────────────────────────────────

/// A borrowed view over one row of a [`Table`].
#[derive(Clone, Copy)]
pub struct Row<'a> {
  table: &'a Table,
  index: usize,
}

impl<'a> Row<'a> {
  pub fn index(&self) -> usize { self.index }

  /// The cell in column `name`; absent columns read as [`Value::Null`].
  pub fn get(&self, name: &str) -> &'a Value {
    const NULL: &Value = &Value::Null;
    self
      .table
      .position(name)
      .map_or(NULL, |i| &self.table.columns[i].values[self.index])
  }

  /// All cells of this row in column order.
  pub fn values(&self) -> impl Iterator<Item = &'a Value> {
    let index = self.index;
    self.table.columns.iter().map(move |c| &c.values[index])
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn from_records_unions_keys_and_fills_nulls() {
    let table = Table::from_records(vec![
      json!({ "id": 1, "name": "a" }),
      json!({ "id": 2, "omw": "50%" }),
    ])
    .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.column_names().collect::<Vec<_>>(), ["id", "name", "omw"]);
    assert_eq!(table.values("name").unwrap()[1], Value::Null);
    assert_eq!(table.values("omw").unwrap()[0], Value::Null);
    assert_eq!(table.values("omw").unwrap()[1], Value::from("50%"));
  }

  #[test]
  fn from_records_rejects_non_objects() {
    let err = Table::from_records(vec![json!({ "id": 1 }), json!([1, 2])]).unwrap_err();
    assert!(matches!(err, Error::NotARecord(1)));
  }

  #[test]
  fn nested_values_stay_json() {
    let table = Table::from_records(vec![json!({ "colors": ["W", "U"] })]).unwrap();
    assert_eq!(table.values("colors").unwrap()[0], Value::Json(json!(["W", "U"])));
  }

  #[test]
  fn select_missing_column_fails() {
    let table = Table::from_records(vec![json!({ "id": 1 })]).unwrap();
    assert!(matches!(table.select(&["id", "nope"]), Err(Error::MissingColumn(c)) if c == "nope"));
  }

  #[test]
  fn set_column_checks_length() {
    let mut table = Table::from_records(vec![json!({ "id": 1 }), json!({ "id": 2 })]).unwrap();
    assert!(table.set_column("x", vec![Value::Null]).is_err());
    table.set_column("x", vec![Value::Int(7), Value::Int(8)]).unwrap();
    assert_eq!(table.row(1).get("x"), &Value::Int(8));
  }

  #[test]
  fn drop_duplicates_keeps_first() {
    let table = Table::from_records(vec![
      json!({ "id": 1, "name": "first" }),
      json!({ "id": 2, "name": "other" }),
      json!({ "id": 1, "name": "second" }),
    ])
    .unwrap();
    let deduped = table.drop_duplicates(&["id"]).unwrap();
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped.row(0).get("name"), &Value::from("first"));
  }

  #[test]
  fn null_serializes_as_json_null() {
    let cells = vec![Value::Null, Value::Int(3), Value::from("x")];
    assert_eq!(serde_json::to_value(&cells).unwrap(), json!([null, 3, "x"]));
  }
}
