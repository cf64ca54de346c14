//! Field definitions and layouts.
//!
//! A [`Field`] identifies one slot in an entry's layout: a stable handle plus
//! a [`FieldKind`] discriminant. Block-group fields carry their nested block
//! types, each of which is itself a list of fields.

use serde::{Deserialize, Serialize};

/// Third-party link field types handled by the link handler.
pub const LINK_FIELD_SIGNATURES: &[&str] = &[
    "typedlinkfield\\fields\\LinkField",
    "lenz\\linkfield\\fields\\LinkField",
    "verbb\\hyper\\fields\\HyperField",
    "presseddigital\\linkit\\fields\\LinkitField",
];

/// Field type of the SEO metadata integration.
pub const SEO_FIELD_SIGNATURE: &str = "nystudio107\\seomatic\\fields\\SeoSettings";

/// Third-party block-group field types (nested/child block variants).
pub const BLOCK_GROUP_SIGNATURES: &[&str] = &[
    "benf\\neo\\Field",
    "verbb\\supertable\\fields\\SuperTableField",
];

/// Concrete field types known to the engine.
///
/// Anything else is carried as [`FieldKind::Custom`] with the host's type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    PlainText,
    Number,
    Lightswitch,
    Date,
    Email,
    Url,
    Color,
    Dropdown,
    RadioButtons,
    Checkboxes,
    MultiSelect,
    Entries,
    Categories,
    Tags,
    Users,
    Assets,
    Link,
    Matrix,
    /// Any other field type, identified by the host's type name
    Custom(String),
}

impl FieldKind {
    /// Stable discriminant used to cache handler lookups.
    pub fn type_key(&self) -> &str {
        match self {
            FieldKind::PlainText => "plainText",
            FieldKind::Number => "number",
            FieldKind::Lightswitch => "lightswitch",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Color => "color",
            FieldKind::Dropdown => "dropdown",
            FieldKind::RadioButtons => "radioButtons",
            FieldKind::Checkboxes => "checkboxes",
            FieldKind::MultiSelect => "multiSelect",
            FieldKind::Entries => "entries",
            FieldKind::Categories => "categories",
            FieldKind::Tags => "tags",
            FieldKind::Users => "users",
            FieldKind::Assets => "assets",
            FieldKind::Link => "link",
            FieldKind::Matrix => "matrix",
            FieldKind::Custom(name) => name,
        }
    }

    /// `Some(multi)` for option-set fields, `None` otherwise.
    pub fn option_cardinality(&self) -> Option<bool> {
        match self {
            FieldKind::Dropdown | FieldKind::RadioButtons => Some(false),
            FieldKind::Checkboxes | FieldKind::MultiSelect => Some(true),
            _ => None,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            FieldKind::Entries | FieldKind::Categories | FieldKind::Tags | FieldKind::Users
        )
    }

    pub fn is_link(&self) -> bool {
        match self {
            FieldKind::Link => true,
            FieldKind::Custom(name) => LINK_FIELD_SIGNATURES.contains(&name.as_str()),
            _ => false,
        }
    }

    pub fn is_seo_bundle(&self) -> bool {
        matches!(self, FieldKind::Custom(name) if name == SEO_FIELD_SIGNATURE)
    }

    pub fn is_block_group(&self) -> bool {
        match self {
            FieldKind::Matrix => true,
            FieldKind::Custom(name) => BLOCK_GROUP_SIGNATURES.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Whether values of this kind are plain scalars the host can serialize itself.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::PlainText
                | FieldKind::Number
                | FieldKind::Lightswitch
                | FieldKind::Date
                | FieldKind::Email
                | FieldKind::Url
                | FieldKind::Color
        )
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_key())
    }
}

/// One selectable option of an option-set field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDef {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub default: bool,
}

impl OptionDef {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            default: false,
        }
    }
}

/// A block type of a block-group field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockType {
    pub handle: String,
    #[serde(default)]
    pub name: String,
    pub fields: Vec<Field>,
}

impl BlockType {
    pub fn new(handle: impl Into<String>, fields: Vec<Field>) -> Self {
        let handle = handle.into();
        Self {
            name: handle.clone(),
            handle,
            fields,
        }
    }

    pub fn field(&self, handle: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.handle == handle)
    }
}

/// Definition of a field in a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field handle, unique within a layout
    pub handle: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Whether a value is required when saving live content
    #[serde(default)]
    pub required: bool,
    /// Options of option-set fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDef>,
    /// Block types of block-group fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_types: Vec<BlockType>,
}

impl Field {
    /// Create a new optional field definition.
    pub fn optional(handle: impl Into<String>, kind: FieldKind) -> Self {
        let handle = handle.into();
        Self {
            name: handle.clone(),
            handle,
            kind,
            required: false,
            options: Vec::new(),
            block_types: Vec::new(),
        }
    }

    /// Create a new required field definition.
    pub fn required(handle: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            required: true,
            ..Self::optional(handle, kind)
        }
    }

    pub fn with_options(mut self, options: Vec<OptionDef>) -> Self {
        self.options = options;
        self
    }

    pub fn with_block_types(mut self, block_types: Vec<BlockType>) -> Self {
        self.block_types = block_types;
        self
    }

    /// Label of an option value, if the field defines it.
    pub fn option_label(&self, value: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
    }

    pub fn block_type(&self, handle: &str) -> Option<&BlockType> {
        self.block_types.iter().find(|b| b.handle == handle)
    }

    /// Nested field `handle` of block type `block_type`.
    pub fn block_field(&self, block_type: &str, handle: &str) -> Option<&Field> {
        self.block_type(block_type)?.field(handle)
    }
}

/// An ordered set of fields attached to a kind of entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLayout {
    pub handle: String,
    pub fields: Vec<Field>,
}

impl FieldLayout {
    pub fn new(handle: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            handle: handle.into(),
            fields,
        }
    }

    pub fn field(&self, handle: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.handle == handle)
    }
}

pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "Null",
        serde_json::Value::Bool(_) => "Bool",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        serde_json::Value::Number(_) => "Float",
        serde_json::Value::String(_) => "String",
        serde_json::Value::Array(_) => "Array",
        serde_json::Value::Object(_) => "Object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_keys() {
        assert_eq!(FieldKind::PlainText.type_key(), "plainText");
        assert_eq!(FieldKind::Matrix.to_string(), "matrix");
        assert_eq!(
            FieldKind::Custom(SEO_FIELD_SIGNATURE.into()).type_key(),
            SEO_FIELD_SIGNATURE
        );
    }

    #[test]
    fn family_detection() {
        assert_eq!(FieldKind::Dropdown.option_cardinality(), Some(false));
        assert_eq!(FieldKind::Checkboxes.option_cardinality(), Some(true));
        assert_eq!(FieldKind::Entries.option_cardinality(), None);

        assert!(FieldKind::Tags.is_relation());
        assert!(!FieldKind::Assets.is_relation());

        assert!(FieldKind::Link.is_link());
        assert!(FieldKind::Custom("verbb\\hyper\\fields\\HyperField".into()).is_link());
        assert!(!FieldKind::Custom("acme\\fields\\Thing".into()).is_link());

        assert!(FieldKind::Custom(SEO_FIELD_SIGNATURE.into()).is_seo_bundle());
        assert!(FieldKind::Custom("benf\\neo\\Field".into()).is_block_group());
        assert!(FieldKind::Matrix.is_block_group());
    }

    #[test]
    fn block_field_lookup() {
        let field = Field::optional("content", FieldKind::Matrix).with_block_types(vec![
            BlockType::new(
                "text",
                vec![Field::required("body", FieldKind::PlainText)],
            ),
        ]);

        assert!(field.block_type("text").is_some());
        assert_eq!(field.block_field("text", "body").unwrap().handle, "body");
        assert!(field.block_field("text", "missing").is_none());
        assert!(field.block_field("image", "body").is_none());
    }

    #[test]
    fn option_labels() {
        let field = Field::optional("color", FieldKind::Dropdown).with_options(vec![
            OptionDef::new("red", "Red"),
            OptionDef::new("blue", "Blue"),
        ]);
        assert_eq!(field.option_label("blue"), Some("Blue"));
        assert_eq!(field.option_label("green"), None);
    }

    #[test]
    fn field_serialization() {
        let field = Field::required("count", FieldKind::Number);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "number");
        assert_eq!(json["required"], true);
        assert!(json.get("options").is_none());

        let custom: Field = serde_json::from_value(serde_json::json!({
            "handle": "seo",
            "type": {"custom": SEO_FIELD_SIGNATURE}
        }))
        .unwrap();
        assert!(custom.kind.is_seo_bundle());
        assert!(!custom.required);
    }
}
