//! Value normalization for change detection.
//!
//! Rules:
//! - strings are trimmed
//! - floats with an integral value compare equal to the integer
//! - object keys are sorted, arrays preserve order
//! - everything else is unchanged

use crate::RecordId;
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;

/// Deep-normalize a JSON value for comparison.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Number(n) => normalize_number(n),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k.clone(), normalize(v));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn normalize_number(n: &Number) -> Value {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                return Value::from(f as i64);
            }
        }
    }
    Value::Number(n.clone())
}

/// Structural inequality after normalization.
pub fn values_differ(old: &Value, new: &Value) -> bool {
    normalize(old) != normalize(new)
}

/// Null, empty string, empty array and empty object are all blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Read a number from a JSON number or numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Truthiness as the host's toggle fields understand it.
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Coerce an id from an integer, integral float, numeric string or `{id}` object.
pub fn coerce_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as RecordId)
        }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("id").and_then(coerce_id),
        _ => None,
    }
}

/// Collect ids from a single value or a list, ignoring anything non-numeric.
pub fn coerce_ids(value: &Value) -> Vec<RecordId> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(coerce_id).collect(),
        other => coerce_id(other).into_iter().collect(),
    }
}

/// Order-independent id set.
pub fn id_set(value: &Value) -> BTreeSet<RecordId> {
    coerce_ids(value).into_iter().collect()
}
