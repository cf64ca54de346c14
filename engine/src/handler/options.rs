//! Single- and multi-select option fields.

use super::{Exported, FieldHandler, ImportContext};
use crate::{error::Result, Field, FieldKind, FieldValue, OptionValue};
use serde_json::Value;
use std::collections::BTreeSet;

/// Exports options as `{value, label}` objects, imports raw values.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptionsHandler;

impl OptionsHandler {
    pub const NAME: &'static str = "options";

    pub fn new() -> Self {
        Self
    }
}

/// Single vs multi: from the field when known, otherwise from the payload.
fn is_multi(field: &Field, value: &Value) -> bool {
    field
        .kind
        .option_cardinality()
        .unwrap_or_else(|| value.is_array())
}

/// Raw option value out of a `{value, label}` object or a bare scalar.
fn extract_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Object(map) => map.get("value")?,
        other => other,
    };
    match raw {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "" }.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn value_set(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(extract_value).collect(),
        other => extract_value(other).into_iter().collect(),
    }
}

fn to_option(field: &Field, raw: &Value) -> Option<OptionValue> {
    let value = extract_value(raw)?;
    let label = field
        .option_label(&value)
        .map(str::to_string)
        .or_else(|| {
            raw.get("label")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| value.clone());
    Some(OptionValue { value, label })
}

impl FieldHandler for OptionsHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, field: &Field) -> bool {
        field.kind.option_cardinality().is_some()
    }

    fn export(&self, field: &Field, value: &FieldValue) -> Result<Exported> {
        let exported = match value {
            FieldValue::Choice(Some(option)) => option.to_json(),
            FieldValue::Choice(None) => Value::Null,
            FieldValue::Choices(options) => options.iter().map(OptionValue::to_json).collect(),
            FieldValue::Null if field.kind.option_cardinality() == Some(true) => {
                Value::Array(Vec::new())
            }
            FieldValue::Scalar(Value::Array(items)) => items
                .iter()
                .filter_map(|v| to_option(field, v))
                .map(|o| o.to_json())
                .collect(),
            FieldValue::Scalar(raw) => to_option(field, raw)
                .map(|o| o.to_json())
                .unwrap_or(Value::Null),
            other => other.to_plain_json(),
        };
        Ok(Exported::Value(exported))
    }

    fn import(&self, field: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
        if is_multi(field, value) {
            let options = match value {
                Value::Array(items) => items.iter().filter_map(|v| to_option(field, v)).collect(),
                Value::Null => Vec::new(),
                other => to_option(field, other).into_iter().collect(),
            };
            return Ok(FieldValue::Choices(options));
        }

        let single = match value {
            Value::Array(items) => items.first().and_then(|v| to_option(field, v)),
            other => to_option(field, other),
        };
        Ok(FieldValue::Choice(single))
    }

    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        Ok(value_set(old) != value_set(new))
    }

    fn priority(&self) -> i32 {
        50
    }

    fn placeholder(&self, handle: &str) -> Field {
        // Cardinality is left unknown so it is read from the payload.
        Field::optional(handle, FieldKind::Custom(Self::NAME.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OptionDef;
    use serde_json::json;

    fn ctx() -> ImportContext {
        ImportContext::new(1, None, "color")
    }

    fn dropdown() -> Field {
        Field::optional("color", FieldKind::Dropdown).with_options(vec![
            OptionDef::new("red", "Red"),
            OptionDef::new("blue", "Blue"),
        ])
    }

    fn checkboxes() -> Field {
        Field::optional("sizes", FieldKind::Checkboxes).with_options(vec![
            OptionDef::new("s", "Small"),
            OptionDef::new("m", "Medium"),
            OptionDef::new("l", "Large"),
        ])
    }

    #[test]
    fn exports_value_and_label() {
        let handler = OptionsHandler::new();
        let value = FieldValue::Choice(Some(OptionValue::new("red", "Red")));
        assert_eq!(
            handler.export(&dropdown(), &value).unwrap(),
            Exported::Value(json!({"value": "red", "label": "Red"}))
        );

        let multi = FieldValue::Choices(vec![
            OptionValue::new("s", "Small"),
            OptionValue::new("l", "Large"),
        ]);
        assert_eq!(
            handler.export(&checkboxes(), &multi).unwrap(),
            Exported::Value(json!([
                {"value": "s", "label": "Small"},
                {"value": "l", "label": "Large"}
            ]))
        );

        assert_eq!(
            handler.export(&checkboxes(), &FieldValue::Null).unwrap(),
            Exported::Value(json!([]))
        );
        assert_eq!(
            handler.export(&dropdown(), &FieldValue::Null).unwrap(),
            Exported::Value(Value::Null)
        );
    }

    #[test]
    fn exports_raw_stored_values() {
        let handler = OptionsHandler::new();
        assert_eq!(
            handler.export(&dropdown(), &FieldValue::text("blue")).unwrap(),
            Exported::Value(json!({"value": "blue", "label": "Blue"}))
        );
        assert_eq!(
            handler
                .export(&checkboxes(), &FieldValue::Scalar(json!(["m"])))
                .unwrap(),
            Exported::Value(json!([{"value": "m", "label": "Medium"}]))
        );
    }

    #[test]
    fn imports_raw_values_with_field_labels() {
        let handler = OptionsHandler::new();
        assert_eq!(
            handler
                .import(&dropdown(), &json!({"value": "blue", "label": "ignored"}), &ctx())
                .unwrap(),
            FieldValue::Choice(Some(OptionValue::new("blue", "Blue")))
        );
        assert_eq!(
            handler.import(&dropdown(), &json!("red"), &ctx()).unwrap(),
            FieldValue::Choice(Some(OptionValue::new("red", "Red")))
        );
        assert_eq!(
            handler
                .import(&checkboxes(), &json!(["m", {"value": "s"}]), &ctx())
                .unwrap(),
            FieldValue::Choices(vec![
                OptionValue::new("m", "Medium"),
                OptionValue::new("s", "Small"),
            ])
        );
        assert_eq!(
            handler.import(&checkboxes(), &json!(null), &ctx()).unwrap(),
            FieldValue::Choices(vec![])
        );
    }

    #[test]
    fn infers_cardinality_without_metadata() {
        let handler = OptionsHandler::new();
        let placeholder = handler.placeholder("sizes");

        assert_eq!(
            handler
                .import(&placeholder, &json!([{"value": "a", "label": "A"}]), &ctx())
                .unwrap(),
            FieldValue::Choices(vec![OptionValue::new("a", "A")])
        );
        assert_eq!(
            handler
                .import(&placeholder, &json!({"value": "a", "label": "A"}), &ctx())
                .unwrap(),
            FieldValue::Choice(Some(OptionValue::new("a", "A")))
        );
    }

    #[test]
    fn multi_select_compare_ignores_order() {
        let handler = OptionsHandler::new();
        let old = json!([{"value": "s", "label": "Small"}, {"value": "l", "label": "Large"}]);

        assert!(!handler
            .has_changed(&checkboxes(), &old, &json!(["l", "s"]))
            .unwrap());
        assert!(handler
            .has_changed(&checkboxes(), &old, &json!(["l"]))
            .unwrap());
        assert!(!handler
            .has_changed(&dropdown(), &json!({"value": "red", "label": "Red"}), &json!("red"))
            .unwrap());
        assert!(!handler
            .has_changed(&dropdown(), &json!(null), &json!(""))
            .unwrap());
    }
}
