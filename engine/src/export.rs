//! Export orchestrator.
//!
//! Turns a record into the flat wire document
//! `{metadata: {id, siteId}, title, ...fields}`. A failing field is logged
//! and left out; it never aborts the export.

use crate::{
    error::{Error, Result},
    handler::{Exported, FieldHandler},
    host::ContentHost,
    registry::HandlerRegistry,
    Field, Record, RecordId, SiteId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys of the document envelope; custom fields may not use them.
pub(crate) const RESERVED_DOCUMENT_KEYS: &[&str] = &["metadata", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub id: RecordId,
    pub site_id: SiteId,
}

/// One exported record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub title: String,
    /// Custom field values by handle, in layout order
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ExportDocument {
    /// The document as a single JSON object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 2);
        let mut metadata = Map::with_capacity(2);
        metadata.insert("id".into(), Value::from(self.metadata.id));
        metadata.insert("siteId".into(), Value::from(self.metadata.site_id));
        map.insert("metadata".into(), Value::Object(metadata));
        map.insert("title".into(), Value::String(self.title.clone()));
        for (handle, value) in &self.fields {
            map.insert(handle.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// The document in its wire form, a one-element array.
    pub fn to_wire(&self) -> Value {
        Value::Array(vec![self.to_value()])
    }
}

/// Export one field: the host's own serialization when the handler allows
/// it and the host has one, the handler's export otherwise.
pub(crate) fn export_field<H: ContentHost + ?Sized>(
    host: &H,
    handler: &dyn FieldHandler,
    record: &Record,
    field: &Field,
    native: &Map<String, Value>,
) -> Result<Exported> {
    if handler.use_native_serialization() {
        if let Some(value) = native.get(&field.handle) {
            return Ok(Exported::Value(value.clone()));
        }
    }
    let value = host.field_value(record, &field.handle)?;
    handler.export(field, &value)
}

/// Exports records from a host.
#[derive(Debug)]
pub struct Exporter<'a, H: ?Sized> {
    host: &'a H,
    registry: &'a HandlerRegistry,
}

impl<'a, H: ContentHost + ?Sized> Exporter<'a, H> {
    pub fn new(host: &'a H, registry: &'a HandlerRegistry) -> Self {
        Self { host, registry }
    }

    /// Look up a record by id and export it.
    pub fn export_by_id(&self, id: RecordId, site_id: SiteId) -> Result<ExportDocument> {
        let record = self
            .host
            .find_record(id, site_id)?
            .ok_or(Error::NotFound { id, site_id })?;
        self.export_record(&record)
    }

    /// Look up a record by URI or slug and export it.
    pub fn export_by_path(&self, path: &str, site_id: SiteId) -> Result<ExportDocument> {
        let record = self
            .host
            .find_record_by_path(path, site_id)?
            .ok_or_else(|| Error::PathNotFound {
                path: path.to_string(),
                site_id,
            })?;
        self.export_record(&record)
    }

    /// Export every custom field of a record.
    pub fn export_record(&self, record: &Record) -> Result<ExportDocument> {
        let schema = self.host.field_schema(record)?;
        let native = self.host.native_serialized_values(record)?;
        let mut fields = Map::with_capacity(schema.len());

        for field in &schema {
            if RESERVED_DOCUMENT_KEYS.contains(&field.handle.as_str()) {
                tracing::debug!(field = %field.handle, "field shadows a document key, skipping");
                continue;
            }

            let handler = self.registry.get_handler(field)?;
            match export_field(self.host, handler.as_ref(), record, field, &native) {
                Ok(Exported::Value(value)) => {
                    fields.insert(field.handle.clone(), value);
                }
                Ok(Exported::Omit) => {
                    tracing::debug!(field = %field.handle, handler = handler.name(), "field omitted from export");
                }
                Err(e) => {
                    tracing::warn!(
                        field = %field.handle,
                        entry_id = record.id,
                        error = %e,
                        "failed to export field"
                    );
                }
            }
        }

        tracing::debug!(entry_id = record.id, fields = fields.len(), "exported entry");
        Ok(ExportDocument {
            metadata: ExportMetadata {
                id: record.id,
                site_id: record.site_id,
            },
            title: record.title.clone(),
            fields,
        })
    }
}
