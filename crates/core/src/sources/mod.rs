//! Per-source field extraction.
//!
//! Every extractor takes the payload by reference and returns an
//! [`Extraction`] or `None` when the payload does not have the shape it
//! expects. Identity, the fallback clock and the raw payload are attached by
//! the [`Normalizer`](crate::normalizer::Normalizer).

pub mod deploy;
pub mod github;
pub mod posthog;
pub mod prometheus;
pub mod stripe;

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

use crate::types::{Labels, TriggerKind};

/// Source-specific fields pulled out of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub trigger: TriggerKind,
    /// Start time reported by the payload itself, if well-formed.
    pub starts_at: Option<DateTime<Utc>>,
    pub labels: Labels,
    pub annotations: Labels,
}

impl Extraction {
    pub(crate) fn new(trigger: TriggerKind) -> Self {
        Self {
            trigger,
            starts_at: None,
            labels: Labels::new(),
            annotations: Labels::new(),
        }
    }

    /// Inserts the value under `key` when it is a string, number or boolean.
    pub(crate) fn label_scalar(&mut self, key: &str, value: Option<&Value>) {
        if let Some(text) = value.and_then(scalar_to_string) {
            self.labels.insert(key.to_string(), text);
        }
    }

    /// Inserts the first scalar found among `pointers` under `key`.
    pub(crate) fn label_first(&mut self, key: &str, payload: &Value, pointers: &[&str]) {
        if let Some(text) = first_scalar(payload, pointers) {
            self.labels.insert(key.to_string(), text);
        }
    }
}

/// Renders strings, numbers and booleans as label text.
///
/// Numbers follow JavaScript's `String(n)` for the common cases: a float with
/// no fractional part renders without a trailing `.0`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number_to_string(number)),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn number_to_string(number: &Number) -> String {
    match number.as_f64() {
        Some(float)
            if !number.is_i64()
                && !number.is_u64()
                && float.fract() == 0.0
                && float.abs() < 1e21 =>
        {
            if float == 0.0 {
                "0".to_string()
            } else {
                format!("{float:.0}")
            }
        }
        _ => number.to_string(),
    }
}

/// Like [`scalar_to_string`] but skips values JavaScript treats as falsy
/// (`null`, `false`, `0`, `""`).
pub(crate) fn truthy_scalar_to_string(value: &Value) -> Option<String> {
    let falsy = match value {
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|float| float == 0.0),
        Value::String(text) => text.is_empty(),
        _ => false,
    };
    if falsy {
        return None;
    }
    scalar_to_string(value)
}

/// Returns the first scalar among `pointers`, skipping missing, null and
/// structured values.
pub(crate) fn first_scalar(payload: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .find_map(scalar_to_string)
}

/// Returns the first value among `pointers` that `parse` accepts.
pub(crate) fn first_timestamp(
    payload: &Value,
    pointers: &[&str],
    parse: fn(&Value) -> Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    pointers
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .find_map(parse)
}

/// Parses an RFC 3339 string.
pub(crate) fn parse_rfc3339(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Interprets a JSON number as Unix seconds. Sub-millisecond remainders are
/// truncated toward zero.
pub(crate) fn parse_unix_seconds(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(seconds) = value.as_i64() {
        return DateTime::from_timestamp_millis(seconds.checked_mul(1000)?);
    }
    let seconds = value.as_f64()?;
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).trunc();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Accepts either an RFC 3339 string or Unix seconds.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(_) => parse_rfc3339(value),
        Value::Number(_) => parse_unix_seconds(value),
        _ => None,
    }
}
