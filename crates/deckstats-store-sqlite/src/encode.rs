//! Text encodings between [`Value`] cells and what SQLite stores.
//!
//! Timestamps are RFC 3339 UTC strings at second precision with a `Z`
//! suffix, so string comparison in SQL orders them chronologically. Cells of
//! the bulk-copy stream use the PostgreSQL `COPY … FORMAT text` conventions:
//! `\N` for null, backslash escapes for tab, newline, carriage return and
//! backslash.

use chrono::{DateTime, SecondsFormat, Utc};
use deckstats_core::table::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Secs, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Copy cells ──────────────────────────────────────────────────────────────

pub const NULL_MARKER: &str = "\\N";

/// Append the text form of `value` to `out`.
pub fn encode_cell(value: &Value, out: &mut String) -> Result<()> {
  match value {
    Value::Null => out.push_str(NULL_MARKER),
    Value::Bool(b) => out.push(if *b { '1' } else { '0' }),
    Value::Int(i) => out.push_str(&i.to_string()),
    Value::Float(f) => out.push_str(&f.to_string()),
    Value::Str(s) => escape(s, out),
    Value::Timestamp(t) => out.push_str(&encode_dt(*t)),
    Value::Json(j) => escape(&serde_json::to_string(j)?, out),
  }
  Ok(())
}

fn escape(s: &str, out: &mut String) {
  for c in s.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '\t' => out.push_str("\\t"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      c => out.push(c),
    }
  }
}

/// Decode one field of a copy line. `None` is SQL `NULL`.
pub fn decode_cell(field: &str) -> Option<String> {
  if field == NULL_MARKER {
    return None;
  }
  let mut out = String::with_capacity(field.len());
  let mut chars = field.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('t') => out.push('\t'),
      Some('n') => out.push('\n'),
      Some('r') => out.push('\r'),
      Some(other) => out.push(other),
      None => out.push('\\'),
    }
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let early = encode_dt(Utc.with_ymd_and_hms(2023, 9, 30, 23, 59, 59).unwrap());
    let late = encode_dt(Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap());
    assert_eq!(late, "2023-10-01T00:00:00Z");
    assert!(early < late);
    assert_eq!(decode_dt(&late).unwrap(), Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn awkward_text_survives_the_stream() {
    let mut line = String::new();
    encode_cell(&Value::from("tab\there\nback\\slash"), &mut line).unwrap();
    assert!(!line.contains('\t') && !line.contains('\n'));
    assert_eq!(decode_cell(&line).as_deref(), Some("tab\there\nback\\slash"));
  }

  #[test]
  fn null_and_literal_backslash_n_differ() {
    let mut null = String::new();
    encode_cell(&Value::Null, &mut null).unwrap();
    let mut text = String::new();
    encode_cell(&Value::from("\\N"), &mut text).unwrap();
    assert_eq!(decode_cell(&null), None);
    assert_eq!(decode_cell(&text).as_deref(), Some("\\N"));
  }
}
