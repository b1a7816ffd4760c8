//! Named enrichment steps.
//!
//! Each step reads one or more source columns and writes a target column.
//! The set is closed: a step configuration names one of the variants below
//! through its `name` tag.

use deckstats_core::{
  deck::{COLORS, UNKNOWN_ARCHETYPE_ID, UNKNOWN_ARCHETYPE_NAME, col, color_column},
  table::{Table, Value},
};
use serde::Deserialize;

use crate::{Error, Result, schema::to_datetime};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Step {
  /// `target = prefix + source` for text cells.
  Prepend {
    source: String,
    target: String,
    prefix: String,
  },
  /// Remove one trailing `suffix` from text cells; an empty result is null.
  StripSuffix {
    source: String,
    target: String,
    suffix: String,
  },
  /// Row-wise sum of numeric columns; nulls count as zero.
  ColumnSum {
    sources: Vec<String>,
    target:  String,
  },
  /// Replace null cells with `value`.
  FillNull {
    source: String,
    target: String,
    value:  serde_json::Value,
  },
  /// Whether `value` is an element of a list cell (or a substring of a text
  /// cell).
  IsinList {
    source: String,
    target: String,
    value:  String,
  },
  /// Parse epoch seconds or RFC 3339 text into timestamps.
  ToDatetime {
    source: String,
    target: String,
  },
  /// Format timestamps with a `strftime` pattern.
  Strftime {
    source: String,
    target: String,
    format: String,
  },
}

/// The deck enrichment pipeline, in the order it must run.
pub fn deck_steps(base_url: &str) -> Vec<Step> {
  let mut steps = vec![
    Step::Prepend {
      source: col::URL.into(),
      target: col::URL.into(),
      prefix: base_url.trim_end_matches('/').to_owned(),
    },
    Step::StripSuffix {
      source: col::OMW.into(),
      target: col::OMW_PERCENT.into(),
      suffix: "%".into(),
    },
    Step::ColumnSum {
      sources: vec![col::WINS.into(), col::LOSSES.into(), col::DRAWS.into()],
      target:  col::MATCHES.into(),
    },
    Step::FillNull {
      source: col::ARCHETYPE_ID.into(),
      target: col::ARCHETYPE_ID.into(),
      value:  UNKNOWN_ARCHETYPE_ID.into(),
    },
    Step::FillNull {
      source: col::ARCHETYPE_NAME.into(),
      target: col::ARCHETYPE_NAME.into(),
      value:  UNKNOWN_ARCHETYPE_NAME.into(),
    },
  ];
  steps.extend(COLORS.iter().map(|c| Step::IsinList {
    source: col::COLORS.into(),
    target: color_column(*c),
    value:  c.to_string(),
  }));
  for (ts, date) in [(col::CREATED, col::CREATED_DATE), (col::UPDATED, col::UPDATED_DATE)] {
    steps.push(Step::ToDatetime { source: ts.into(), target: ts.into() });
    steps.push(Step::Strftime { source: ts.into(), target: date.into(), format: "%Y%m%d".into() });
  }
  steps
}

pub(crate) fn column<'t>(table: &'t Table, name: &str) -> Result<&'t [Value]> {
  table.values(name).map_err(|_| Error::MissingColumn(name.to_owned()))
}

fn coerce_err(row: usize, column: &str, value: &Value, dtype: &str) -> Error {
  Error::Coerce {
    row,
    column: column.to_owned(),
    value: format!("{value:?}"),
    dtype: dtype.to_owned(),
  }
}

/// Map every cell of `source` through `f`, writing the result to `target`.
fn map_column(
  table: &mut Table,
  source: &str,
  target: &str,
  mut f: impl FnMut(usize, &Value) -> Result<Value>,
) -> Result<()> {
  let values = column(table, source)?
    .iter()
    .enumerate()
    .map(|(i, v)| f(i, v))
    .collect::<Result<Vec<_>>>()?;
  table.set_column(target, values)?;
  Ok(())
}

impl Step {
  pub fn target(&self) -> &str {
    match self {
      Self::Prepend { target, .. }
      | Self::StripSuffix { target, .. }
      | Self::ColumnSum { target, .. }
      | Self::FillNull { target, .. }
      | Self::IsinList { target, .. }
      | Self::ToDatetime { target, .. }
      | Self::Strftime { target, .. } => target,
    }
  }

  /// One-line rendering for logs, e.g. `url = prepend(url, "https://…")`.
  pub fn describe(&self) -> String {
    match self {
      Self::Prepend { source, target, prefix } => format!("{target} = prepend({source}, {prefix:?})"),
      Self::StripSuffix { source, target, suffix } => {
        format!("{target} = strip_suffix({source}, {suffix:?})")
      }
      Self::ColumnSum { sources, target } => format!("{target} = column_sum({})", sources.join(", ")),
      Self::FillNull { source, target, value } => format!("{target} = fill_null({source}, {value})"),
      Self::IsinList { source, target, value } => format!("{target} = isin_list({source}, {value:?})"),
      Self::ToDatetime { source, target } => format!("{target} = to_datetime({source})"),
      Self::Strftime { source, target, format } => format!("{target} = strftime({source}, {format:?})"),
    }
  }

  pub fn apply(&self, table: &mut Table) -> Result<()> {
    match self {
      Self::Prepend { source, target, prefix } => map_column(table, source, target, |i, v| match v {
        Value::Null => Ok(Value::Null),
        Value::Str(s) => Ok(Value::Str(format!("{prefix}{s}"))),
        other => Err(coerce_err(i, source, other, "string")),
      }),

      Self::StripSuffix { source, target, suffix } => map_column(table, source, target, |_, v| {
        Ok(match v {
          Value::Str(s) => {
            let stripped = s.strip_suffix(suffix.as_str()).unwrap_or(s);
            if stripped.is_empty() { Value::Null } else { Value::Str(stripped.to_owned()) }
          }
          other => other.clone(),
        })
      }),

      Self::ColumnSum { sources, target } => {
        let mut sums = vec![Value::Int(0); table.len()];
        for source in sources {
          for (i, v) in column(table, source)?.iter().enumerate() {
            sums[i] = match (&sums[i], v) {
              (acc, Value::Null) => acc.clone(),
              (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
              (acc, other) => match (acc.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => Value::Float(a + b),
                _ => return Err(coerce_err(i, source, other, "number")),
              },
            };
          }
        }
        table.set_column(target, sums)?;
        Ok(())
      }

      Self::FillNull { source, target, value } => {
        let fill = Value::from_json(value.clone());
        map_column(table, source, target, |_, v| {
          Ok(if v.is_null() { fill.clone() } else { v.clone() })
        })
      }

      Self::IsinList { source, target, value } => map_column(table, source, target, |_, v| {
        let found = match v {
          Value::Json(serde_json::Value::Array(items)) => {
            items.iter().any(|item| item.as_str() == Some(value.as_str()))
          }
          Value::Str(s) => s.contains(value.as_str()),
          _ => false,
        };
        Ok(Value::Bool(found))
      }),

      Self::ToDatetime { source, target } => map_column(table, source, target, |i, v| {
        if v.is_null() {
          return Ok(Value::Null);
        }
        to_datetime(v)
          .map(Value::Timestamp)
          .map_err(|()| coerce_err(i, source, v, "datetime"))
      }),

      Self::Strftime { source, target, format } => map_column(table, source, target, |i, v| match v {
        Value::Null => Ok(Value::Null),
        Value::Timestamp(t) => Ok(Value::Str(t.format(format).to_string())),
        other => Err(coerce_err(i, source, other, "datetime")),
      }),
    }
  }
}
