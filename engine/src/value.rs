//! Live field values as held by the host.
//!
//! [`FieldValue`] is what the host returns for a field handle and what
//! handlers produce on import. Each family has its own variant so handlers
//! never probe values for capabilities at call time.

use crate::RecordId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A selected option of an option-set field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub value: String,
    pub label: String,
}

impl OptionValue {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "value": self.value, "label": self.label })
    }
}

/// A referenced asset.
///
/// Imported assets carry only an id; the host fills in the rest on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub id: RecordId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl AssetRef {
    pub fn from_id(id: RecordId) -> Self {
        Self {
            id,
            url: None,
            title: None,
            alt: None,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "url": self.url,
            "title": self.title,
            "alt": self.alt,
        })
    }
}

/// Link types whose target is another element rather than a URL.
pub const ELEMENT_LINK_TYPES: &[&str] = &["entry", "asset", "category"];

/// A link object (URL, element, email, phone, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkValue {
    #[serde(rename = "type")]
    pub link_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    /// Linked element id for element link types
    #[serde(default)]
    pub element: Option<RecordId>,
}

impl LinkValue {
    pub fn url(link_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link_type: link_type.into(),
            url: Some(url.into()),
            label: None,
            target: None,
            aria_label: None,
            element: None,
        }
    }

    pub fn element(link_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            link_type: link_type.into(),
            url: None,
            label: None,
            target: None,
            aria_label: None,
            element: Some(id),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Whether the link points at an element (entry, asset, category).
    pub fn is_element_link(&self) -> bool {
        ELEMENT_LINK_TYPES.contains(&self.link_type.as_str())
    }
}

/// Opaque host object with explicit conversion capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectValue {
    /// Host type name, used in log messages
    pub class: String,
    /// String conversion, if the object supports one
    #[serde(default)]
    pub text: Option<String>,
    /// Structured conversion, if the object supports one
    #[serde(default)]
    pub data: Option<Value>,
}

/// One block of a block-group field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub collapsed: bool,
    /// Synthetic identifier of a block that is new to storage (`slot1`, `slot2`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

fn default_enabled() -> bool {
    true
}

impl Block {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            title: None,
            enabled: true,
            collapsed: false,
            slot: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, handle: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(handle.into(), value);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// The current value of a field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    #[default]
    Null,
    /// String, number or boolean
    Scalar(Value),
    Date(DateTime<Utc>),
    /// Single-select option
    Choice(Option<OptionValue>),
    /// Multi-select options
    Choices(Vec<OptionValue>),
    /// Referenced entry/category/tag/user ids
    Relations(Vec<RecordId>),
    Assets(Vec<AssetRef>),
    Link(Option<LinkValue>),
    Links(Vec<LinkValue>),
    /// SEO integration container, in the integration's nested shape
    Seo(Value),
    Blocks(Vec<Block>),
    Object(ObjectValue),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Scalar(Value::String(s.into()))
    }

    /// Wrap a raw JSON value without any family-specific interpretation.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            other => FieldValue::Scalar(other.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Family-agnostic JSON rendering, used where no handler applies.
    pub fn to_plain_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::Date(d) => Value::String(format_date(d)),
            FieldValue::Choice(o) => o
                .as_ref()
                .map(|o| Value::String(o.value.clone()))
                .unwrap_or(Value::Null),
            FieldValue::Choices(opts) => opts.iter().map(|o| json!(o.value)).collect(),
            FieldValue::Relations(ids) => json!(ids),
            FieldValue::Assets(assets) => assets.iter().map(|a| json!(a.id)).collect(),
            FieldValue::Link(link) => serde_json::to_value(link).unwrap_or(Value::Null),
            FieldValue::Links(links) => serde_json::to_value(links).unwrap_or(Value::Null),
            FieldValue::Seo(v) => v.clone(),
            FieldValue::Blocks(blocks) => serde_json::to_value(blocks).unwrap_or(Value::Null),
            FieldValue::Object(obj) => obj
                .data
                .clone()
                .or_else(|| obj.text.clone().map(Value::String))
                .unwrap_or(Value::Null),
        }
    }
}

/// ISO-8601 rendering used for all exported dates.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}
