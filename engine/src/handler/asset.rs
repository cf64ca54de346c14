//! Asset (file/media) references.

use super::{Exported, FieldHandler, ImportContext};
use crate::{
    error::Result,
    normalize::{coerce_ids, id_set},
    AssetRef, Field, FieldKind, FieldValue,
};
use serde_json::Value;

/// A single asset exports as a flat `{id, url, title, alt}` object, several
/// as an array of them, none as null. Import only needs the ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssetHandler;

impl AssetHandler {
    pub const NAME: &'static str = "asset";

    pub fn new() -> Self {
        Self
    }
}

fn export_assets(assets: &[AssetRef]) -> Value {
    match assets {
        [] => Value::Null,
        [single] => single.to_json(),
        many => many.iter().map(AssetRef::to_json).collect(),
    }
}

impl FieldHandler for AssetHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, field: &Field) -> bool {
        field.kind == FieldKind::Assets
    }

    fn export(&self, _field: &Field, value: &FieldValue) -> Result<Exported> {
        let exported = match value {
            FieldValue::Assets(assets) => export_assets(assets),
            FieldValue::Relations(ids) => {
                let assets: Vec<AssetRef> = ids.iter().copied().map(AssetRef::from_id).collect();
                export_assets(&assets)
            }
            FieldValue::Null => Value::Null,
            other => other.to_plain_json(),
        };
        Ok(Exported::Value(exported))
    }

    fn import(&self, _field: &Field, value: &Value, _ctx: &ImportContext) -> Result<FieldValue> {
        let mut ids = coerce_ids(value);
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(FieldValue::Assets(
            ids.into_iter().map(AssetRef::from_id).collect(),
        ))
    }

    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        Ok(id_set(old) != id_set(new))
    }

    fn priority(&self) -> i32 {
        70
    }

    fn placeholder(&self, handle: &str) -> Field {
        Field::optional(handle, FieldKind::Assets)
    }
}
