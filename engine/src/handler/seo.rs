//! SEO metadata bundles from the SEO integration.
//!
//! The integration stores its settings in a nested container
//! (`{"metaGlobalVars": {"seoTitle": ...}}`). On the wire the bundle is a
//! flat map with a fixed key set, always complete, with blank and template
//! placeholder values reported as null.

use super::{Exported, FieldHandler, ImportContext};
use crate::{error::Result, field::SEO_FIELD_SIGNATURE, normalize, Field, FieldKind, FieldValue};
use serde_json::{Map, Value};

/// Wire key and container key of every exported SEO setting.
pub const SEO_KEYS: &[(&str, &str)] = &[
    ("title", "seoTitle"),
    ("description", "seoDescription"),
    ("keywords", "seoKeywords"),
    ("image", "seoImage"),
    ("imageDescription", "seoImageDescription"),
    ("canonicalUrl", "canonicalUrl"),
    ("robots", "robots"),
    ("ogTitle", "ogTitle"),
    ("ogDescription", "ogDescription"),
    ("ogImage", "ogImage"),
    ("ogType", "ogType"),
    ("twitterTitle", "twitterTitle"),
    ("twitterDescription", "twitterDescription"),
    ("twitterImage", "twitterImage"),
    ("twitterCard", "twitterCard"),
];

const CONTAINER_KEY: &str = "metaGlobalVars";

#[derive(Debug, Default, Clone, Copy)]
pub struct SeoHandler;

impl SeoHandler {
    pub const NAME: &'static str = "seo";

    pub fn new() -> Self {
        Self
    }
}

/// Template fallbacks such as `{{ entry.title }}` or `{seomatic.entry.title}`.
fn is_template(s: &str) -> bool {
    s.contains("{{") || s.contains("{%") || (s.starts_with('{') && s.ends_with('}'))
}

fn clean(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() || is_template(s) {
                Value::Null
            } else {
                Value::String(s.to_string())
            }
        }
        Some(other) => other.clone(),
    }
}

/// Flat wire map out of a stored container (or an already flat map).
fn flatten(stored: &Value) -> Map<String, Value> {
    let container = stored.get(CONTAINER_KEY).unwrap_or(stored);
    SEO_KEYS
        .iter()
        .map(|(wire, inner)| {
            let raw = container.get(*inner).or_else(|| container.get(*wire));
            (wire.to_string(), clean(raw))
        })
        .collect()
}

/// Normalized projection of a wire map for comparison.
fn project(wire: &Value) -> Map<String, Value> {
    SEO_KEYS
        .iter()
        .map(|(key, _)| (key.to_string(), normalize::normalize(&clean(wire.get(*key)))))
        .collect()
}

impl FieldHandler for SeoHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, field: &Field) -> bool {
        field.kind.is_seo_bundle()
    }

    fn export(&self, _field: &Field, value: &FieldValue) -> Result<Exported> {
        let stored = match value {
            FieldValue::Seo(v) | FieldValue::Scalar(v) => v.clone(),
            _ => Value::Null,
        };
        Ok(Exported::Value(Value::Object(flatten(&stored))))
    }

    fn import(&self, _field: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
        let vars: Map<String, Value> = SEO_KEYS
            .iter()
            .map(|(wire, inner)| {
                let v = match clean(value.get(*wire)) {
                    Value::Null => Value::String(String::new()),
                    other => other,
                };
                (inner.to_string(), v)
            })
            .collect();

        let mut container = Map::new();
        container.insert(CONTAINER_KEY.to_string(), Value::Object(vars));
        Ok(FieldValue::Seo(Value::Object(container)))
    }

    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        let old = project(old);
        let new = project(new);

        for (key, _) in SEO_KEYS {
            if old.get(*key) != new.get(*key) {
                return Ok(true);
            }
        }
        Ok(old != new)
    }

    fn priority(&self) -> i32 {
        80
    }

    fn placeholder(&self, handle: &str) -> Field {
        Field::optional(handle, FieldKind::Custom(SEO_FIELD_SIGNATURE.to_string()))
    }
}
