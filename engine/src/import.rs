//! Import orchestrator.
//!
//! Merges an edited export document back into a draft of the original
//! record. Only fields present in the payload are considered, and only the
//! ones whose handler reports a change are written. When nothing changed, or
//! nothing could be written, no draft is saved.
//!
//! Fields go through the host's native setter only when their handler allows
//! it and the host exposes a native value for them; everything else goes
//! through the handler's import.
//!
//! ```text
//! Validating -> EntryLookup -> ChangeDetection -> NoChange
//!                                              -> DraftCreation -> FieldApplication -> NothingApplied
//!                                                 -> Persisting -> Success | PersistFailure
//! ```

use crate::{
    error::{Error, Result, ValidationErrors},
    export::{export_field, RESERVED_DOCUMENT_KEYS},
    handler::{Exported, FieldHandler, ImportContext},
    host::ContentHost,
    normalize::coerce_id,
    registry::HandlerRegistry,
    Field, Record, RecordId, Scenario, SiteId, UserId, DEFAULT_SITE_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const NO_CHANGES_MESSAGE: &str = "No changes detected";

/// Message reported when every changed field failed to apply.
pub const NOTHING_APPLIED_MESSAGE: &str = "None of the changed fields could be applied";

/// A validated import payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDocument {
    pub entry_id: RecordId,
    pub site_id: SiteId,
    /// New title, when the payload carries a non-null one
    pub title: Option<String>,
    /// Every other payload key, in payload order
    pub fields: Map<String, Value>,
}

impl ImportDocument {
    /// Parse a JSON text payload.
    pub fn parse_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(Error::BadInput("payload is empty".into()));
        }
        let value: Value = serde_json::from_str(input)
            .map_err(|e| Error::BadInput(format!("malformed payload: {e}")))?;
        Self::parse(&value)
    }

    /// Validate a payload: unwrap the one-element array form and read the
    /// metadata block. `siteId` defaults to the primary site.
    pub fn parse(payload: &Value) -> Result<Self> {
        let object = match payload {
            Value::Object(map) => map,
            Value::Array(items) => match items.as_slice() {
                [Value::Object(map)] => map,
                [] => return Err(Error::BadInput("payload is empty".into())),
                _ => {
                    return Err(Error::BadInput(
                        "payload must be an object or a one-element array of objects".into(),
                    ))
                }
            },
            Value::Null => return Err(Error::BadInput("payload is empty".into())),
            _ => return Err(Error::BadInput("payload must be a JSON object".into())),
        };
        if object.is_empty() {
            return Err(Error::BadInput("payload is empty".into()));
        }

        let metadata = object.get("metadata").and_then(Value::as_object);
        let entry_id = metadata
            .and_then(|m| m.get("id"))
            .and_then(coerce_id)
            .ok_or_else(|| Error::BadInput("metadata.id is required".into()))?;
        let site_id = match metadata.and_then(|m| m.get("siteId")) {
            None | Some(Value::Null) => DEFAULT_SITE_ID,
            Some(raw) => coerce_id(raw)
                .ok_or_else(|| Error::BadInput(format!("metadata.siteId is not an id: {raw}")))?,
        };

        let title = match object.get("title") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let fields = object
            .iter()
            .filter(|(key, _)| !RESERVED_DOCUMENT_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            entry_id,
            site_id,
            title,
            fields,
        })
    }
}

/// What an import would change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub entry_id: RecordId,
    pub site_id: SiteId,
    /// New title, if it differs from the current one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Handles of changed custom fields, in layout order
    pub fields: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.fields.is_empty()
    }

    /// Every changed key, `title` first.
    pub fn changed_keys(&self) -> Vec<String> {
        self.title
            .iter()
            .map(|_| "title".to_string())
            .chain(self.fields.iter().cloned())
            .collect()
    }
}

/// Outcome of an import, in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub entry_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp_edit_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
    pub message: String,
}

impl ImportResult {
    fn unchanged(entry_id: RecordId) -> Self {
        Self {
            success: true,
            entry_id,
            draft_id: None,
            updated_fields: None,
            cp_edit_url: None,
            errors: None,
            message: NO_CHANGES_MESSAGE.to_string(),
        }
    }

    fn rejected(entry_id: RecordId, message: String, errors: ValidationErrors) -> Self {
        Self {
            success: false,
            entry_id,
            draft_id: None,
            updated_fields: None,
            cp_edit_url: None,
            errors: Some(errors),
            message,
        }
    }
}

/// A changed custom field with everything needed to apply it.
struct PendingField<'p> {
    field: Field,
    handler: Arc<dyn FieldHandler>,
    value: &'p Value,
    /// The handler allows the host serializer and the host has one for this field
    native: bool,
}

/// Imports edited documents into drafts.
#[derive(Debug)]
pub struct Importer<'a, H: ?Sized> {
    host: &'a H,
    registry: &'a HandlerRegistry,
}

impl<'a, H: ContentHost + ?Sized> Importer<'a, H> {
    pub fn new(host: &'a H, registry: &'a HandlerRegistry) -> Self {
        Self { host, registry }
    }

    /// Report what importing `payload` would change, without creating a draft.
    pub fn detect_changes(&self, payload: &Value) -> Result<ChangeSet> {
        let doc = ImportDocument::parse(payload)?;
        let record = self.lookup(&doc)?;
        let (changes, _) = self.detect(&doc, &record)?;
        Ok(changes)
    }

    /// Merge the changed fields of `payload` into a new draft and save it.
    ///
    /// Record-level failures (bad payload, missing entry) are errors; a draft
    /// rejected by validation is reported as an unsuccessful result.
    pub fn import_record(&self, payload: &Value, acting_user: Option<UserId>) -> Result<ImportResult> {
        let doc = ImportDocument::parse(payload)?;
        let record = self.lookup(&doc)?;
        let (changes, pending) = self.detect(&doc, &record)?;

        if changes.is_empty() {
            tracing::info!(entry_id = record.id, "no changes detected, skipping draft");
            return Ok(ImportResult::unchanged(record.id));
        }

        let mut draft = self.host.create_draft(&record, acting_user)?;
        draft.scenario = Scenario::Live;
        tracing::info!(
            entry_id = record.id,
            draft_id = ?draft.draft_id,
            changed = changes.fields.len() + usize::from(changes.title.is_some()),
            "created draft"
        );

        let mut updated = Vec::new();
        if let Some(title) = &changes.title {
            draft.title = title.clone();
            updated.push("title".to_string());
        }

        let failed = self.apply_fields(&mut draft, &pending);
        updated.extend(
            pending
                .iter()
                .map(|p| &p.field.handle)
                .filter(|handle| !failed.contains_key(handle.as_str()))
                .cloned(),
        );

        if updated.is_empty() {
            tracing::warn!(entry_id = record.id, failed = ?failed.keys().collect::<Vec<_>>(), "no field could be applied, draft not saved");
            return Ok(ImportResult::rejected(
                record.id,
                NOTHING_APPLIED_MESSAGE.to_string(),
                failed,
            ));
        }

        match self.host.save_draft(&mut draft) {
            Ok(()) => {}
            Err(Error::ValidationFailed { message, errors }) => {
                tracing::warn!(entry_id = record.id, %message, "draft failed validation");
                return Ok(ImportResult::rejected(record.id, message, errors));
            }
            Err(e) => return Err(e),
        }

        tracing::info!(entry_id = record.id, draft_id = ?draft.draft_id, updated = ?updated, "draft saved");
        Ok(ImportResult {
            success: true,
            entry_id: record.id,
            draft_id: draft.draft_id,
            message: format!("Draft created with {} updated field(s)", updated.len()),
            updated_fields: Some(updated),
            cp_edit_url: Some(self.host.edit_url(&draft)),
            errors: None,
        })
    }

    fn lookup(&self, doc: &ImportDocument) -> Result<Record> {
        self.host
            .find_record(doc.entry_id, doc.site_id)?
            .ok_or(Error::NotFound {
                id: doc.entry_id,
                site_id: doc.site_id,
            })
    }

    fn detect<'p>(
        &self,
        doc: &'p ImportDocument,
        record: &Record,
    ) -> Result<(ChangeSet, Vec<PendingField<'p>>)> {
        let title = doc
            .title
            .as_ref()
            .filter(|title| **title != record.title)
            .cloned();

        let schema = self.host.field_schema(record)?;
        let native = self.host.native_serialized_values(record)?;

        for handle in doc.fields.keys() {
            if !schema.iter().any(|f| &f.handle == handle) {
                tracing::debug!(field = %handle, "payload key is not a field of this entry, skipping");
            }
        }

        let mut pending = Vec::new();
        for field in schema {
            let Some(value) = doc.fields.get(&field.handle) else {
                continue;
            };
            let handler = self.registry.get_handler(&field)?;

            let baseline = match export_field(self.host, handler.as_ref(), record, &field, &native) {
                Ok(Exported::Value(v)) => v,
                Ok(Exported::Omit) => Value::Null,
                Err(e) => {
                    tracing::warn!(field = %field.handle, error = %e, "failed to export baseline, skipping");
                    continue;
                }
            };

            match handler.has_changed(&field, &baseline, value) {
                Ok(true) => pending.push(PendingField {
                    native: handler.use_native_serialization() && native.contains_key(&field.handle),
                    field,
                    handler,
                    value,
                }),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(field = %field.handle, error = %e, "failed to compare field, skipping");
                }
            }
        }

        let changes = ChangeSet {
            entry_id: record.id,
            site_id: record.site_id,
            title,
            fields: pending.iter().map(|p| p.field.handle.clone()).collect(),
        };
        Ok((changes, pending))
    }

    /// Write changed fields to the draft. Returns the failure messages of the
    /// fields that could not be written, by handle.
    fn apply_fields(&self, draft: &mut Record, pending: &[PendingField<'_>]) -> ValidationErrors {
        let mut failed = ValidationErrors::new();

        let (native, custom): (Vec<&PendingField<'_>>, Vec<&PendingField<'_>>) =
            pending.iter().partition(|p| p.native);

        if !native.is_empty() {
            let batch: Map<String, Value> = native
                .iter()
                .map(|p| (p.field.handle.clone(), p.value.clone()))
                .collect();

            if let Err(e) = self.host.set_field_values(draft, &batch) {
                tracing::warn!(error = %e, "bulk field write failed, setting fields one by one");
                for p in &native {
                    if let Err(e) = self.host.set_field_value(draft, &p.field.handle, p.value) {
                        tracing::warn!(field = %p.field.handle, error = %e, "failed to set field");
                        failed.insert(p.field.handle.clone(), vec![e.to_string()]);
                    }
                }
            }
        }

        for p in custom {
            let ctx = ImportContext::new(draft.site_id, draft.draft_id, p.field.handle.as_str());
            let result = p
                .handler
                .import(&p.field, p.value, &ctx)
                .and_then(|value| self.host.put_field_value(draft, &p.field.handle, value));
            if let Err(e) = result {
                tracing::warn!(
                    field = %p.field.handle,
                    handler = p.handler.name(),
                    error = %e,
                    "failed to import field"
                );
                failed.insert(p.field.handle.clone(), vec![e.to_string()]);
            }
        }

        failed
    }
}
