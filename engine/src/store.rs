//! In-memory content host.
//!
//! [`MemoryStore`] implements [`ContentHost`] over a [`StoreSnapshot`]. It
//! backs the CLI, the integration tests and the benchmarks. Only scalar field
//! kinds have a native serialization; everything else goes through handlers.

use crate::{
    error::{Error, Result, ValidationErrors},
    handler::parse_date,
    host::ContentHost,
    normalize::{self, as_f64},
    value::format_date,
    Field, FieldKind, FieldValue, Record, RecordId, SiteId, StoreSnapshot, UserId,
};
use serde_json::{Map, Value};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Message reported when a draft fails validation.
pub const VALIDATION_FAILED_MESSAGE: &str = "Couldn't save draft.";

/// A content host holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Load from snapshot JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        StoreSnapshot::from_json(json).map(Self::new)
    }

    fn lock(&self) -> MutexGuard<'_, StoreSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().clone()
    }

    pub fn into_snapshot(self) -> StoreSnapshot {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// A saved draft by draft id.
    pub fn draft(&self, draft_id: u64) -> Option<Record> {
        self.lock().drafts.get(&draft_id).cloned()
    }

    pub fn draft_count(&self) -> usize {
        self.lock().drafts.len()
    }

    fn layout_fields(&self, layout: &str) -> Result<Vec<Field>> {
        self.lock()
            .layouts
            .get(layout)
            .map(|l| l.fields.clone())
            .ok_or_else(|| Error::Host(format!("unknown field layout '{layout}'")))
    }

    fn scalar_field(&self, record: &Record, handle: &str) -> Result<Field> {
        let field = self
            .layout_fields(&record.layout)?
            .into_iter()
            .find(|f| f.handle == handle)
            .ok_or_else(|| Error::field(handle, "not a field of this entry"))?;
        if !field.kind.is_scalar() {
            return Err(Error::field(
                handle,
                format!("{} fields have no native serialization", field.kind),
            ));
        }
        Ok(field)
    }

    /// Fill in what the host knows about referenced assets and linked elements.
    fn hydrate(&self, value: &mut FieldValue, site_id: SiteId) {
        let state = self.lock();
        hydrate_value(&state, value, site_id);
    }
}

fn hydrate_value(state: &StoreSnapshot, value: &mut FieldValue, site_id: SiteId) {
    match value {
        FieldValue::Assets(assets) => {
            for asset in assets.iter_mut() {
                if let Some(known) = state.assets.get(&asset.id) {
                    *asset = known.clone();
                }
            }
        }
        FieldValue::Link(Some(link)) => hydrate_link(state, link, site_id),
        FieldValue::Links(links) => {
            for link in links.iter_mut() {
                hydrate_link(state, link, site_id);
            }
        }
        FieldValue::Blocks(blocks) => {
            for block in blocks.iter_mut() {
                for nested in block.fields.values_mut() {
                    hydrate_value(state, nested, site_id);
                }
            }
        }
        _ => {}
    }
}

fn hydrate_link(state: &StoreSnapshot, link: &mut crate::LinkValue, site_id: SiteId) {
    let Some(id) = link.element else {
        return;
    };
    link.url = match link.link_type.as_str() {
        "asset" => state.assets.get(&id).and_then(|a| a.url.clone()),
        _ => state
            .get_record(id, site_id)
            .and_then(|r| r.uri.as_deref())
            .map(|uri| format!("{}/{}", state.site_url.trim_end_matches('/'), uri)),
    };
}

/// Host-side serialization of a scalar field value.
fn serialize_native(value: &FieldValue) -> Option<Value> {
    match value {
        FieldValue::Null => Some(Value::Null),
        FieldValue::Scalar(v) => Some(v.clone()),
        FieldValue::Date(d) => Some(Value::String(format_date(d))),
        _ => None,
    }
}

/// Host-side deserialization of a scalar field value.
fn deserialize_native(field: &Field, value: &Value) -> Result<FieldValue> {
    let invalid = || {
        Error::field(
            &field.handle,
            format!("invalid {} value: {}", field.kind, value),
        )
    };

    if value.is_null() {
        return Ok(FieldValue::Null);
    }

    match field.kind {
        FieldKind::Number => match value {
            Value::String(s) if s.trim().is_empty() => Ok(FieldValue::Null),
            Value::Bool(_) => Err(invalid()),
            _ => as_f64(value)
                .map(|_| FieldValue::Scalar(normalize::normalize(&numeric(value))))
                .ok_or_else(invalid),
        },
        FieldKind::Lightswitch => match value {
            Value::Bool(b) => Ok(FieldValue::Scalar(Value::Bool(*b))),
            Value::Number(_) | Value::String(_) => {
                Ok(FieldValue::Scalar(Value::Bool(normalize::as_bool(value))))
            }
            _ => Err(invalid()),
        },
        FieldKind::Date => value
            .as_str()
            .and_then(parse_date)
            .map(FieldValue::Date)
            .ok_or_else(invalid),
        _ => match value {
            Value::String(s) => Ok(FieldValue::text(s.as_str())),
            Value::Number(n) => Ok(FieldValue::text(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::text(b.to_string())),
            _ => Err(invalid()),
        },
    }
}

fn numeric(value: &Value) -> Value {
    match value {
        Value::String(s) => as_f64(value)
            .filter(|_| !s.trim().is_empty())
            .map(Value::from)
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

impl ContentHost for MemoryStore {
    fn find_record(&self, id: RecordId, site_id: SiteId) -> Result<Option<Record>> {
        Ok(self.lock().get_record(id, site_id).cloned())
    }

    fn find_record_by_path(&self, path: &str, site_id: SiteId) -> Result<Option<Record>> {
        let path = path.trim().trim_matches('/');
        let state = self.lock();
        let Some(records) = state.records.get(&site_id) else {
            return Ok(None);
        };
        let found = records
            .values()
            .find(|r| r.uri.as_deref() == Some(path))
            .or_else(|| records.values().find(|r| r.slug.as_deref() == Some(path)));
        Ok(found.cloned())
    }

    fn field_schema(&self, record: &Record) -> Result<Vec<Field>> {
        self.layout_fields(&record.layout)
    }

    fn native_serialized_values(&self, record: &Record) -> Result<Map<String, Value>> {
        let schema = self.field_schema(record)?;
        Ok(schema
            .iter()
            .filter(|f| f.kind.is_scalar())
            .filter_map(|f| {
                serialize_native(record.field_value(&f.handle)).map(|v| (f.handle.clone(), v))
            })
            .collect())
    }

    fn create_draft(&self, record: &Record, acting_user: Option<UserId>) -> Result<Record> {
        let mut state = self.lock();
        let draft_id = state.next_draft_id;
        state.next_draft_id += 1;

        let mut draft = record.clone();
        draft.draft_id = Some(draft_id);
        draft.canonical_id = Some(record.canonical_id.unwrap_or(record.id));
        draft.creator_id = acting_user;
        Ok(draft)
    }

    fn set_field_values(&self, draft: &mut Record, values: &Map<String, Value>) -> Result<()> {
        // Convert everything first so a bad value leaves the draft untouched
        let converted = values
            .iter()
            .map(|(handle, value)| {
                let field = self.scalar_field(draft, handle)?;
                Ok((handle.clone(), deserialize_native(&field, value)?))
            })
            .collect::<Result<Vec<_>>>()?;

        for (handle, value) in converted {
            draft.set_field_value(handle, value);
        }
        Ok(())
    }

    fn set_field_value(&self, draft: &mut Record, handle: &str, value: &Value) -> Result<()> {
        let field = self.scalar_field(draft, handle)?;
        let value = deserialize_native(&field, value)?;
        draft.set_field_value(handle, value);
        Ok(())
    }

    fn put_field_value(&self, draft: &mut Record, handle: &str, mut value: FieldValue) -> Result<()> {
        let schema = self.field_schema(draft)?;
        if !schema.iter().any(|f| f.handle == handle) {
            return Err(Error::field(handle, "not a field of this entry"));
        }
        self.hydrate(&mut value, draft.site_id);
        draft.set_field_value(handle, value);
        Ok(())
    }

    fn save_draft(&self, draft: &mut Record) -> Result<()> {
        let draft_id = draft
            .draft_id
            .ok_or_else(|| Error::Host(format!("record {} is not a draft", draft.id)))?;

        if draft.scenario == crate::Scenario::Live {
            let errors = self.validate(draft)?;
            if !errors.is_empty() {
                return Err(Error::ValidationFailed {
                    message: VALIDATION_FAILED_MESSAGE.to_string(),
                    errors,
                });
            }
        }

        self.lock().drafts.insert(draft_id, draft.clone());
        tracing::debug!(entry_id = draft.id, draft_id, "saved draft");
        Ok(())
    }

    fn edit_url(&self, draft: &Record) -> String {
        let state = self.lock();
        let base = state.cp_url.trim_end_matches('/');
        let id = draft.canonical_id.unwrap_or(draft.id);
        match draft.draft_id {
            Some(draft_id) => format!("{base}/entries/{id}?draftId={draft_id}&siteId={}", draft.site_id),
            None => format!("{base}/entries/{id}?siteId={}", draft.site_id),
        }
    }

    fn integration_enabled(&self, name: &str) -> bool {
        self.lock().integrations.contains(name)
    }
}

impl MemoryStore {
    /// Required-field checks applied to live content.
    fn validate(&self, record: &Record) -> Result<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if record.title.trim().is_empty() {
            errors.insert("title".into(), vec!["Title cannot be blank.".into()]);
        }
        for field in self.field_schema(record)? {
            let blank = normalize::is_blank(&record.field_value(&field.handle).to_plain_json());
            if field.required && blank {
                let name = if field.name.is_empty() {
                    &field.handle
                } else {
                    &field.name
                };
                errors.insert(field.handle.clone(), vec![format!("{name} cannot be blank.")]);
            }
        }
        Ok(errors)
    }
}
