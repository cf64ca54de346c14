//! Entry, category, tag and user relations.

use super::{Exported, FieldHandler, ImportContext};
use crate::{
    error::Result,
    normalize::{coerce_ids, id_set},
    Field, FieldKind, FieldValue, RecordId,
};
use serde_json::{json, Value};

/// Relations travel as plain id arrays and compare as sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationHandler;

impl RelationHandler {
    pub const NAME: &'static str = "relation";

    pub fn new() -> Self {
        Self
    }
}

fn dedup(ids: Vec<RecordId>) -> Vec<RecordId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

impl FieldHandler for RelationHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, field: &Field) -> bool {
        field.kind.is_relation()
    }

    fn export(&self, _field: &Field, value: &FieldValue) -> Result<Exported> {
        let ids = match value {
            FieldValue::Relations(ids) => ids.clone(),
            FieldValue::Null => Vec::new(),
            other => coerce_ids(&other.to_plain_json()),
        };
        Ok(Exported::Value(json!(ids)))
    }

    fn import(&self, field: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
        let ids = coerce_ids(value);
        let expected = match value {
            Value::Array(items) => items.iter().filter(|v| !v.is_null()).count(),
            Value::Null => 0,
            _ => 1,
        };
        if ids.len() != expected {
            tracing::warn!(
                field = %field.handle,
                dropped = expected - ids.len(),
                "ignoring relation ids that are not integers"
            );
        }
        Ok(FieldValue::Relations(dedup(ids)))
    }

    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        Ok(id_set(old) != id_set(new))
    }

    fn priority(&self) -> i32 {
        60
    }

    fn placeholder(&self, handle: &str) -> Field {
        Field::optional(handle, FieldKind::Entries)
    }
}
