//! Native and third-party link fields.

use super::{Exported, FieldHandler, ImportContext};
use crate::{
    error::{Error, Result},
    field::json_type_name,
    normalize::coerce_id,
    Field, FieldKind, FieldValue, LinkValue, RecordId,
};
use serde_json::{Map, Value};

/// Links export as `{type, url, label, target, ariaLabel, element?}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkHandler;

impl LinkHandler {
    pub const NAME: &'static str = "link";

    pub fn new() -> Self {
        Self
    }
}

fn link_to_json(link: &LinkValue) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::String(link.link_type.clone()));
    map.insert("url".into(), opt_string(&link.url));
    map.insert("label".into(), opt_string(&link.label));
    map.insert("target".into(), opt_string(&link.target));
    map.insert("ariaLabel".into(), opt_string(&link.aria_label));
    if let Some(id) = link.element {
        map.insert("element".into(), Value::from(id));
    }
    Value::Object(map)
}

fn opt_string(s: &Option<String>) -> Value {
    s.clone().map(Value::String).unwrap_or(Value::Null)
}

/// Non-empty trimmed string under `key`.
fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_link(handle: &str, value: &Value) -> Result<LinkValue> {
    let map = match value {
        Value::Object(map) => map,
        Value::String(url) => return Ok(LinkValue::url("url", url.trim())),
        other => {
            return Err(Error::field(
                handle,
                format!("expected link object, got {}", json_type_name(other)),
            ))
        }
    };

    let element = map.get("element").and_then(coerce_id);
    let default_type = if element.is_some() { "entry" } else { "url" };
    let link_type = text(map, "type").unwrap_or_else(|| default_type.to_string());

    let mut link = LinkValue {
        link_type,
        url: None,
        label: text(map, "label"),
        target: text(map, "target"),
        aria_label: text(map, "ariaLabel"),
        element: None,
    };

    match element {
        Some(id) if link.is_element_link() => link.element = Some(id),
        _ => link.url = text(map, "url"),
    }
    Ok(link)
}

/// Comparable projection of one link.
#[derive(Debug, PartialEq)]
struct LinkKey {
    link_type: Option<String>,
    url: Option<String>,
    label: Option<String>,
    element: Option<RecordId>,
    target: Option<String>,
}

fn link_keys(value: &Value) -> Vec<LinkKey> {
    let items: Vec<&Value> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => {
                let element = map.get("element").and_then(coerce_id);
                LinkKey {
                    link_type: text(map, "type"),
                    // Element link URLs are derived from the element.
                    url: if element.is_some() { None } else { text(map, "url") },
                    label: text(map, "label"),
                    element,
                    target: text(map, "target"),
                }
            }
            other => LinkKey {
                link_type: None,
                url: other.as_str().map(|s| s.trim().to_string()),
                label: None,
                element: None,
                target: None,
            },
        })
        .collect()
}

impl FieldHandler for LinkHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, field: &Field) -> bool {
        field.kind.is_link()
    }

    fn export(&self, _field: &Field, value: &FieldValue) -> Result<Exported> {
        let exported = match value {
            FieldValue::Link(Some(link)) => link_to_json(link),
            FieldValue::Link(None) | FieldValue::Null => Value::Null,
            FieldValue::Links(links) => links.iter().map(link_to_json).collect(),
            FieldValue::Scalar(Value::String(url)) => link_to_json(&LinkValue::url("url", url)),
            other => other.to_plain_json(),
        };
        Ok(Exported::Value(exported))
    }

    fn import(&self, field: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
        match value {
            Value::Null => Ok(FieldValue::Link(None)),
            Value::Array(items) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| parse_link(&field.handle, v))
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::Links),
            other => parse_link(&field.handle, other).map(|l| FieldValue::Link(Some(l))),
        }
    }

    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        Ok(link_keys(old) != link_keys(new))
    }

    fn priority(&self) -> i32 {
        60
    }

    fn placeholder(&self, handle: &str) -> Field {
        Field::optional(handle, FieldKind::Link)
    }
}
