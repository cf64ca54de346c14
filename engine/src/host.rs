//! The host content system, as seen by the engine.
//!
//! Record storage, layouts, drafts and persistence all live outside the
//! engine. [`ContentHost`] is the narrow interface the orchestrators need.

use crate::{error::Result, Field, FieldValue, Record, RecordId, SiteId, UserId};
use serde_json::{Map, Value};

/// Name the SEO integration is registered under in the host.
pub const SEO_INTEGRATION: &str = "seomatic";

pub trait ContentHost {
    /// Fetch a record by id and site.
    fn find_record(&self, id: RecordId, site_id: SiteId) -> Result<Option<Record>>;

    /// Fetch a record by its URI or slug.
    fn find_record_by_path(&self, path: &str, site_id: SiteId) -> Result<Option<Record>>;

    /// Ordered custom fields of the record's layout.
    fn field_schema(&self, record: &Record) -> Result<Vec<Field>>;

    /// Current value of a custom field.
    fn field_value(&self, record: &Record, handle: &str) -> Result<FieldValue> {
        Ok(record.field_value(handle).clone())
    }

    /// Values the host can serialize itself, by handle.
    ///
    /// Fields absent from the map have no native serialization.
    fn native_serialized_values(&self, record: &Record) -> Result<Map<String, Value>>;

    /// Create a mutable draft copy of a record.
    fn create_draft(&self, record: &Record, acting_user: Option<UserId>) -> Result<Record>;

    /// Set several natively serialized values at once.
    fn set_field_values(&self, draft: &mut Record, values: &Map<String, Value>) -> Result<()>;

    /// Set one natively serialized value.
    fn set_field_value(&self, draft: &mut Record, handle: &str, value: &Value) -> Result<()>;

    /// Store a value produced by a field handler.
    fn put_field_value(&self, draft: &mut Record, handle: &str, value: FieldValue) -> Result<()>;

    /// Persist a draft. Fails with [`crate::Error::ValidationFailed`] when rejected.
    fn save_draft(&self, draft: &mut Record) -> Result<()>;

    /// Control panel URL for editing a draft.
    fn edit_url(&self, draft: &Record) -> String;

    /// Whether an optional integration is installed and enabled.
    fn integration_enabled(&self, _name: &str) -> bool {
        false
    }
}
