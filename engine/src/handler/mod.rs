//! Field handlers.
//!
//! A handler converts one family of field values to the wire format and
//! back, and decides whether an incoming wire value differs from the
//! current one. The registry picks a handler per field by priority.
//!
//! # Hint envelopes
//!
//! When the block-group handler exports a nested field through a non-default
//! handler it wraps the result as `{"__handler": <name>, "__value": <value>}`
//! so import can route the value back to the same handler without the
//! original layout.

mod asset;
mod block_group;
mod default;
mod link;
mod options;
mod relation;
mod seo;

pub use asset::AssetHandler;
pub use block_group::BlockGroupHandler;
pub use default::DefaultHandler;
pub(crate) use default::parse_date;
pub use link::LinkHandler;
pub use options::OptionsHandler;
pub use relation::RelationHandler;
pub use seo::{SeoHandler, SEO_KEYS};

use crate::{error::Result, normalize, Field, FieldKind, FieldValue, SiteId};
use serde_json::{Map, Value};

/// Handlers at or above this priority run their own export/import logic.
pub const SPECIALIZED_PRIORITY: i32 = 50;

pub const HINT_HANDLER_KEY: &str = "__handler";
pub const HINT_VALUE_KEY: &str = "__value";

/// Result of exporting one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Exported {
    Value(Value),
    /// The value has no representable form; leave the field out entirely
    Omit,
}

impl Exported {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Exported::Value(v) => Some(v),
            Exported::Omit => None,
        }
    }
}

impl From<Value> for Exported {
    fn from(value: Value) -> Self {
        Exported::Value(value)
    }
}

/// Ambient information for an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    pub site_id: SiteId,
    /// Draft being populated, if one exists yet
    pub draft_id: Option<u64>,
    /// Dotted path of the field being imported (`content.0.body`)
    pub field_path: String,
}

impl ImportContext {
    pub fn new(site_id: SiteId, draft_id: Option<u64>, field_handle: impl Into<String>) -> Self {
        Self {
            site_id,
            draft_id,
            field_path: field_handle.into(),
        }
    }

    /// Context for a value nested below this one.
    pub fn nested(&self, segment: impl std::fmt::Display) -> Self {
        Self {
            site_id: self.site_id,
            draft_id: self.draft_id,
            field_path: format!("{}.{}", self.field_path, segment),
        }
    }
}

/// Export/import/change-detection strategy for one field family.
pub trait FieldHandler: Send + Sync {
    /// Identity of the handler, also used in hint envelopes.
    fn name(&self) -> &'static str;

    /// Whether this handler applies to `field`. Must be side-effect free.
    fn can_handle(&self, field: &Field) -> bool;

    /// Convert a live value to its wire form.
    fn export(&self, field: &Field, value: &FieldValue) -> Result<Exported>;

    /// Convert a wire value back to something the host can store.
    fn import(&self, field: &Field, value: &Value, ctx: &ImportContext) -> Result<FieldValue>;

    /// Whether `new` differs from the exported baseline `old`.
    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        Ok(normalize::values_differ(old, new))
    }

    fn priority(&self) -> i32 {
        0
    }

    /// Whether the host's own serializer may be used instead of export/import.
    fn use_native_serialization(&self) -> bool {
        self.priority() < SPECIALIZED_PRIORITY
    }

    /// Minimal field descriptor for values that arrive without a layout.
    fn placeholder(&self, handle: &str) -> Field {
        Field::optional(handle, FieldKind::PlainText)
    }
}

impl std::fmt::Debug for dyn FieldHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldHandler")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Wrap an exported value in a hint envelope.
pub fn wrap_hint(handler: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(2);
    map.insert(HINT_HANDLER_KEY.to_string(), Value::String(handler.to_string()));
    map.insert(HINT_VALUE_KEY.to_string(), value);
    Value::Object(map)
}

/// Split a hint envelope into handler name and inner value.
pub fn unwrap_hint(value: &Value) -> Option<(&str, &Value)> {
    static NULL: Value = Value::Null;

    let map = value.as_object()?;
    let handler = map.get(HINT_HANDLER_KEY)?.as_str()?;
    Some((handler, map.get(HINT_VALUE_KEY).unwrap_or(&NULL)))
}

/// Remove every hint envelope in a value, keeping the inner values.
pub fn strip_hints(value: &Value) -> Value {
    if let Some((_, inner)) = unwrap_hint(value) {
        return strip_hints(inner);
    }
    match value {
        Value::Array(items) => Value::Array(items.iter().map(strip_hints).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), strip_hints(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hint_envelope_roundtrip() {
        let wrapped = wrap_hint("relation", json!([1, 2]));
        assert_eq!(wrapped, json!({"__handler": "relation", "__value": [1, 2]}));

        let (name, inner) = unwrap_hint(&wrapped).unwrap();
        assert_eq!(name, "relation");
        assert_eq!(inner, &json!([1, 2]));
    }

    #[test]
    fn plain_values_are_not_hints() {
        assert!(unwrap_hint(&json!({"value": "a", "label": "A"})).is_none());
        assert!(unwrap_hint(&json!({"__handler": 5})).is_none());
        assert!(unwrap_hint(&json!("text")).is_none());
    }

    #[test]
    fn missing_inner_value_reads_null() {
        let hint = json!({"__handler": "asset"});
        let (_, inner) = unwrap_hint(&hint).unwrap();
        assert!(inner.is_null());
    }

    #[test]
    fn strip_nested_hints() {
        let value = json!([{
            "type": "text",
            "tags": {"__handler": "relation", "__value": [3]},
            "inner": {"__handler": "block_group", "__value": [
                {"type": "quote", "link": {"__handler": "link", "__value": {"url": "x"}}}
            ]}
        }]);
        assert_eq!(
            strip_hints(&value),
            json!([{
                "type": "text",
                "tags": [3],
                "inner": [{"type": "quote", "link": {"url": "x"}}]
            }])
        );
    }

    #[test]
    fn nested_context_paths() {
        let ctx = ImportContext::new(1, Some(9), "content");
        let nested = ctx.nested(0).nested("body");
        assert_eq!(nested.field_path, "content.0.body");
        assert_eq!(nested.draft_id, Some(9));
    }
}
