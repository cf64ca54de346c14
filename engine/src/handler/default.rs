//! Catch-all handler for scalar fields.

use super::{Exported, FieldHandler, ImportContext};
use crate::{
    error::Result,
    normalize::{self, as_bool, as_f64},
    value::format_date,
    Field, FieldKind, FieldValue,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Passes scalars through, with type-aware coercion for number, toggle and
/// date fields. Always registered last.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl DefaultHandler {
    pub const NAME: &'static str = "default";

    pub fn new() -> Self {
        Self
    }
}

impl FieldHandler for DefaultHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, _field: &Field) -> bool {
        true
    }

    fn export(&self, field: &Field, value: &FieldValue) -> Result<Exported> {
        let exported = match value {
            FieldValue::Null => Value::Null,
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::Date(d) => Value::String(format_date(d)),
            FieldValue::Object(obj) => match (&obj.text, &obj.data) {
                (Some(text), _) => Value::String(text.clone()),
                (None, Some(data)) => data.clone(),
                (None, None) => {
                    tracing::warn!(
                        field = %field.handle,
                        class = %obj.class,
                        "value has no string or array form, omitting"
                    );
                    return Ok(Exported::Omit);
                }
            },
            other => other.to_plain_json(),
        };
        Ok(Exported::Value(exported))
    }

    fn import(&self, field: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }

        let imported = match field.kind {
            FieldKind::Number => match value {
                Value::String(s) if s.trim().is_empty() => FieldValue::Null,
                Value::Number(_) => FieldValue::Scalar(value.clone()),
                _ => match as_f64(value) {
                    Some(f) => FieldValue::Scalar(number_value(f)),
                    None => {
                        tracing::warn!(field = %field.handle, "value is not numeric, clearing");
                        FieldValue::Null
                    }
                },
            },
            FieldKind::Lightswitch => FieldValue::Scalar(Value::Bool(as_bool(value))),
            FieldKind::Date => match value.as_str().and_then(parse_date) {
                Some(date) => FieldValue::Date(date),
                None => {
                    tracing::warn!(field = %field.handle, value = %value, "could not parse date");
                    FieldValue::Null
                }
            },
            _ => FieldValue::Scalar(value.clone()),
        };
        Ok(imported)
    }

    fn has_changed(&self, field: &Field, old: &Value, new: &Value) -> Result<bool> {
        let changed = match field.kind {
            FieldKind::Number => match (numeric(old), numeric(new)) {
                (Some(a), Some(b)) => (a - b).abs() > f64::EPSILON,
                (None, None) => false,
                _ => true,
            },
            FieldKind::Lightswitch => as_bool(old) != as_bool(new),
            FieldKind::Date => {
                let old_ts = old.as_str().and_then(parse_date).map(|d| d.timestamp());
                let new_ts = new.as_str().and_then(parse_date).map(|d| d.timestamp());
                old_ts != new_ts
            }
            _ => normalize::values_differ(old, new),
        };
        Ok(changed)
    }

    fn priority(&self) -> i32 {
        0
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::Bool(_) => None,
        other => as_f64(other),
    }
}

fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

/// Parse ISO-8601 / RFC 3339 and the common `Y-m-d H:i:s` and `Y-m-d` forms.
pub(crate) fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(d.and_utc());
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}
