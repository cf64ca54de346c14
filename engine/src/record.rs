//! Entry records and drafts.

use crate::{FieldValue, RecordId, SiteId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Validation scenario applied when a record is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Only essential attributes are validated
    #[default]
    Essentials,
    /// All fields are writable and validated as live content
    Live,
}

/// An entry, or a draft copy of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Element id
    pub id: RecordId,
    /// Site (locale) id
    pub site_id: SiteId,
    /// Native title, always present
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Handle of the field layout this record uses
    pub layout: String,
    /// Custom field values by handle
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Set on drafts only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<u64>,
    /// The entry a draft was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<UserId>,
    #[serde(default)]
    pub scenario: Scenario,
}

impl Record {
    /// Create a new record with an empty title.
    pub fn new(id: RecordId, site_id: SiteId, layout: impl Into<String>) -> Self {
        Self {
            id,
            site_id,
            title: String::new(),
            slug: None,
            uri: None,
            layout: layout.into(),
            fields: BTreeMap::new(),
            draft_id: None,
            canonical_id: None,
            creator_id: None,
            scenario: Scenario::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_uri(mut self, slug: impl Into<String>, uri: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self.uri = Some(uri.into());
        self
    }

    pub fn with_field(mut self, handle: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(handle.into(), value);
        self
    }

    /// Current value of a custom field; missing values read as null.
    pub fn field_value(&self, handle: &str) -> &FieldValue {
        static NULL: FieldValue = FieldValue::Null;
        self.fields.get(handle).unwrap_or(&NULL)
    }

    pub fn set_field_value(&mut self, handle: impl Into<String>, value: FieldValue) {
        self.fields.insert(handle.into(), value);
    }

    pub fn is_draft(&self) -> bool {
        self.draft_id.is_some()
    }
}
