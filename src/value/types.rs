//! Tagged attribute values and their store encoding
//!
//! Every value kind owns a deterministic string encoding (the store wire
//! format) and, for orderable kinds, a numeric score used by range indexes.
//!
//! | kind      | encoding                              | score            |
//! |-----------|---------------------------------------|------------------|
//! | integer   | decimal                               | value            |
//! | float     | shortest round-trip decimal           | value            |
//! | boolean   | `1` / `0`                             | 1.0 / 0.0        |
//! | text      | verbatim                              | none             |
//! | datetime  | epoch seconds, microsecond precision  | epoch seconds    |
//! | date      | epoch seconds of midnight UTC         | epoch seconds    |
//! | time      | seconds since midnight                | seconds          |
//! | json      | compact JSON                          | none             |

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{ValueError, ValueResult};

/// Declared kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    Text,
    #[serde(rename = "datetime")]
    DateTime,
    Date,
    Time,
    Json,
}

impl ValueKind {
    /// Returns the kind name used in error messages and schema files
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "text",
            ValueKind::DateTime => "datetime",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Json => "json",
        }
    }

    /// Whether values of this kind carry a numeric score
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueKind::Text | ValueKind::Json)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed attribute value
///
/// Deserializes untagged, so plain JSON numbers, strings and booleans map to
/// `Integer`/`Float`, `Text` and `Boolean`; arrays and objects become `Json`.
/// A temporal value therefore arrives from JSON as `Text` (ISO 8601) or as an
/// epoch number; see [`Value::coerce`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(serde_json::Value),
}

impl Value {
    /// Returns the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Text(_) => ValueKind::Text,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Json(_) => ValueKind::Json,
        }
    }

    /// Encodes the value into its store representation
    pub fn encode(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Boolean(v) => (if *v { "1" } else { "0" }).to_string(),
            Value::Text(v) => v.clone(),
            Value::DateTime(v) => (v.timestamp_micros() as f64 / 1_000_000.0).to_string(),
            Value::Date(v) => date_timestamp(v).to_string(),
            Value::Time(v) => time_seconds(v).to_string(),
            Value::Json(v) => v.to_string(),
        }
    }

    /// Decodes a stored string as the given kind
    pub fn decode(kind: ValueKind, raw: &str) -> ValueResult<Value> {
        match kind {
            ValueKind::Integer => raw
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| ValueError::decode(kind, raw, e)),
            ValueKind::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ValueError::decode(kind, raw, e)),
            ValueKind::Boolean => match raw {
                "1" => Ok(Value::Boolean(true)),
                "0" | "" => Ok(Value::Boolean(false)),
                _ => Err(ValueError::decode(kind, raw, "expected 1 or 0")),
            },
            ValueKind::Text => Ok(Value::Text(raw.to_string())),
            ValueKind::DateTime => {
                let seconds = parse_seconds(kind, raw)?;
                let micros = (seconds * 1_000_000.0).round() as i64;
                DateTime::from_timestamp_micros(micros)
                    .map(Value::DateTime)
                    .ok_or_else(|| ValueError::decode(kind, raw, "timestamp out of range"))
            }
            ValueKind::Date => {
                let seconds = parse_seconds(kind, raw)?;
                DateTime::from_timestamp(seconds.floor() as i64, 0)
                    .map(|dt| Value::Date(dt.date_naive()))
                    .ok_or_else(|| ValueError::decode(kind, raw, "timestamp out of range"))
            }
            ValueKind::Time => {
                let seconds = parse_seconds(kind, raw)?;
                if !(0.0..86_400.0).contains(&seconds) {
                    return Err(ValueError::decode(kind, raw, "outside of a day"));
                }
                let micros = (seconds * 1_000_000.0).round() as u64;
                let whole = (micros / 1_000_000) as u32;
                let nanos = ((micros % 1_000_000) * 1_000) as u32;
                NaiveTime::from_num_seconds_from_midnight_opt(whole, nanos)
                    .map(Value::Time)
                    .ok_or_else(|| ValueError::decode(kind, raw, "invalid time of day"))
            }
            ValueKind::Json => serde_json::from_str(raw)
                .map(Value::Json)
                .map_err(|e| ValueError::decode(kind, raw, e)),
        }
    }

    /// Reads ISO 8601 text as the temporal `kind` it names.
    ///
    /// RFC 3339 for datetimes, `YYYY-MM-DD` for dates, `HH:MM:SS[.f]` for
    /// times. Anything else is returned unchanged.
    pub fn coerce(&self, kind: ValueKind) -> Value {
        let Value::Text(raw) = self else {
            return self.clone();
        };
        let parsed = match kind {
            ValueKind::DateTime => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
            ValueKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Value::Date),
            ValueKind::Time => NaiveTime::parse_from_str(raw, "%H:%M:%S%.f").ok().map(Value::Time),
            _ => None,
        };
        parsed.unwrap_or_else(|| self.clone())
    }

    /// Numeric score for range indexes, if the kind is orderable
    pub fn score(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::DateTime(v) => Some(v.timestamp_micros() as f64 / 1_000_000.0),
            Value::Date(v) => Some(date_timestamp(v) as f64),
            Value::Time(v) => Some(time_seconds(v)),
            Value::Text(_) | Value::Json(_) => None,
        }
    }

    /// Returns the text if this is a `Text` value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Checks the value against a declared kind
    pub fn expect_kind(&self, expected: ValueKind) -> ValueResult<()> {
        let actual = self.kind();
        if actual == expected {
            Ok(())
        } else {
            Err(ValueError::KindMismatch { expected, actual })
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

fn date_timestamp(date: &NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn time_seconds(time: &NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 + f64::from(time.nanosecond() / 1_000) / 1_000_000.0
}

fn parse_seconds(kind: ValueKind, raw: &str) -> ValueResult<f64> {
    let seconds = raw
        .parse::<f64>()
        .map_err(|e| ValueError::decode(kind, raw, e))?;
    if seconds.is_finite() {
        Ok(seconds)
    } else {
        Err(ValueError::decode(kind, raw, "not a finite number"))
    }
}
