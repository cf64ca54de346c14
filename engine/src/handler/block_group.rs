//! Repeatable block groups, including blocks nested inside blocks.
//!
//! Each nested field is exported through its own handler. Non-default
//! results are wrapped in a hint envelope naming that handler, so import can
//! hand the value back to it without the layout. Values that arrive without
//! an envelope go through the handler of the block layout's field, and fall
//! back to shape detection, which is best effort, when the layout does not
//! know the key.

use super::{
    strip_hints, unwrap_hint, wrap_hint, AssetHandler, DefaultHandler, Exported, FieldHandler,
    ImportContext, LinkHandler, OptionsHandler, RelationHandler, SeoHandler,
};
use crate::{
    error::{Error, Result},
    field::json_type_name,
    normalize::{self, as_bool},
    Block, Field, FieldKind, FieldValue, HandlerRegistry,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

/// Block keys that are not nested fields.
const RESERVED_KEYS: &[&str] = &["type", "title", "enabled", "collapsed"];

static NULL_VALUE: FieldValue = FieldValue::Null;

/// Delegates nested fields back through the registry it was built with.
#[derive(Debug, Clone)]
pub struct BlockGroupHandler {
    registry: Weak<HandlerRegistry>,
}

impl BlockGroupHandler {
    pub const NAME: &'static str = "block_group";

    pub fn new(registry: Weak<HandlerRegistry>) -> Self {
        Self { registry }
    }

    fn registry(&self, handle: &str) -> Result<Arc<HandlerRegistry>> {
        self.registry
            .upgrade()
            .ok_or_else(|| Error::field(handle, "handler registry is no longer available"))
    }

    fn export_block(
        &self,
        registry: &HandlerRegistry,
        field: &Field,
        block: &Block,
    ) -> Result<Value> {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(block.block_type.clone()));
        if let Some(title) = &block.title {
            map.insert("title".into(), Value::String(title.clone()));
        }
        map.insert("enabled".into(), Value::Bool(block.enabled));
        map.insert("collapsed".into(), Value::Bool(block.collapsed));

        let schema = field
            .block_type(&block.block_type)
            .map(|bt| bt.fields.as_slice())
            .unwrap_or_default();

        // Layout order first, then values the layout does not know about.
        let mut entries: Vec<(String, Option<&Field>, &FieldValue)> = schema
            .iter()
            .map(|f| {
                let value = block.fields.get(&f.handle).unwrap_or(&NULL_VALUE);
                (f.handle.clone(), Some(f), value)
            })
            .collect();
        entries.extend(
            block
                .fields
                .iter()
                .filter(|(handle, _)| !schema.iter().any(|f| &f.handle == *handle))
                .map(|(handle, value)| (handle.clone(), None, value)),
        );

        for (handle, nested, value) in entries {
            if RESERVED_KEYS.contains(&handle.as_str()) {
                tracing::warn!(
                    field = %field.handle,
                    nested = %handle,
                    "nested field uses a reserved key, skipping"
                );
                continue;
            }

            let handler = match nested {
                Some(f) => registry.get_handler(f)?,
                None => match registry.handler_named(handler_for_value(value)) {
                    Some(h) => h,
                    None => {
                        let plain = Field::optional(handle.as_str(), FieldKind::PlainText);
                        registry.get_handler(&plain)?
                    }
                },
            };
            let placeholder;
            let nested_field = match nested {
                Some(f) => f,
                None => {
                    placeholder = handler.placeholder(&handle);
                    &placeholder
                }
            };

            let exported = match handler.export(nested_field, value) {
                Ok(Exported::Value(v)) => v,
                Ok(Exported::Omit) => {
                    tracing::debug!(field = %field.handle, nested = %handle, "nested value omitted");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        field = %field.handle,
                        nested = %handle,
                        error = %e,
                        "nested export failed, skipping"
                    );
                    continue;
                }
            };

            let wire = if handler.name() == DefaultHandler::NAME {
                exported
            } else {
                wrap_hint(handler.name(), exported)
            };
            map.insert(handle, wire);
        }

        Ok(Value::Object(map))
    }

    fn import_block(
        &self,
        registry: &HandlerRegistry,
        field: &Field,
        index: usize,
        value: &Value,
        ctx: &ImportContext,
    ) -> Result<Block> {
        let obj = value.as_object().ok_or_else(|| {
            Error::field(
                &ctx.field_path,
                format!("block {index} must be an object, got {}", json_type_name(value)),
            )
        })?;
        let block_type = obj
            .get("type")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::field(&ctx.field_path, format!("block {index} has no type")))?;

        let mut block = Block::new(block_type);
        block.title = obj
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);
        block.enabled = obj.get("enabled").map(as_bool).unwrap_or(true);
        block.collapsed = obj.get("collapsed").map(as_bool).unwrap_or(false);
        block.slot = Some(format!("slot{}", index + 1));

        let block_ctx = ctx.nested(index);
        for (key, raw) in obj {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let nested_ctx = block_ctx.nested(key);
            let nested = field.block_field(block_type, key);

            let (hinted, inner) = match unwrap_hint(raw) {
                Some((name, inner)) => {
                    let handler = registry.handler_named(name);
                    if handler.is_none() {
                        tracing::warn!(
                            field = %nested_ctx.field_path,
                            handler = %name,
                            "unknown handler hint, falling back to the block layout"
                        );
                    }
                    (handler, inner)
                }
                None => (None, raw),
            };

            let imported = match (hinted, nested) {
                (Some(handler), _) => {
                    let nested_field = nested
                        .filter(|f| handler.can_handle(f))
                        .cloned()
                        .unwrap_or_else(|| handler.placeholder(key));
                    handler.import(&nested_field, inner, &nested_ctx)?
                }
                (None, Some(f)) => registry.get_handler(f)?.import(f, inner, &nested_ctx)?,
                (None, None) => self.import_by_shape(registry, key, inner, &nested_ctx)?,
            };
            block.fields.insert(key.clone(), imported);
        }

        Ok(block)
    }

    /// Best-effort import of a value that carries no handler hint.
    fn import_by_shape(
        &self,
        registry: &HandlerRegistry,
        handle: &str,
        value: &Value,
        ctx: &ImportContext,
    ) -> Result<FieldValue> {
        let name = match guess_handler(value) {
            Some(name) => name,
            None => return Ok(FieldValue::from_json(value)),
        };
        match registry.handler_named(name) {
            Some(handler) => handler.import(&handler.placeholder(handle), value, ctx),
            None => Ok(FieldValue::from_json(value)),
        }
    }
}

/// Handler that produced a stored value, judged by its variant.
fn handler_for_value(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Choice(_) | FieldValue::Choices(_) => OptionsHandler::NAME,
        FieldValue::Relations(_) => RelationHandler::NAME,
        FieldValue::Assets(_) => AssetHandler::NAME,
        FieldValue::Link(_) | FieldValue::Links(_) => LinkHandler::NAME,
        FieldValue::Seo(_) => SeoHandler::NAME,
        FieldValue::Blocks(_) => BlockGroupHandler::NAME,
        _ => DefaultHandler::NAME,
    }
}

fn objects(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// Shape detection for unhinted values: options, then assets, then links.
fn guess_handler(value: &Value) -> Option<&'static str> {
    let objects = objects(value);
    if objects.is_empty() {
        return None;
    }
    if let Value::Array(items) = value {
        if items.len() != objects.len() {
            return None;
        }
    }

    if objects
        .iter()
        .all(|m| m.contains_key("value") && m.contains_key("label"))
    {
        Some(OptionsHandler::NAME)
    } else if objects.iter().all(|m| m.contains_key("id")) {
        Some(AssetHandler::NAME)
    } else if objects
        .iter()
        .all(|m| ["type", "url", "element"].iter().any(|k| m.contains_key(*k)))
    {
        Some(LinkHandler::NAME)
    } else {
        None
    }
}

fn as_block_list(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Array(items) => Some(items.iter().collect()),
        _ => None,
    }
}

fn field_keys(block: &Value) -> BTreeSet<&str> {
    block
        .as_object()
        .map(|m| {
            m.keys()
                .map(String::as_str)
                .filter(|k| !RESERVED_KEYS.contains(k))
                .collect()
        })
        .unwrap_or_default()
}

fn block_differs(old: &Value, new: &Value) -> bool {
    let text = |v: &Value, key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let enabled = |v: &Value| v.get("enabled").map(as_bool).unwrap_or(true);

    if text(old, "type") != text(new, "type") || enabled(old) != enabled(new) {
        return true;
    }
    if new.get("title").is_some() && text(old, "title") != text(new, "title") {
        return true;
    }

    let old_keys = field_keys(old);
    if old_keys != field_keys(new) {
        return true;
    }
    old_keys.into_iter().any(|key| {
        let a = old.get(key).map(strip_hints).unwrap_or(Value::Null);
        let b = new.get(key).map(strip_hints).unwrap_or(Value::Null);
        normalize::values_differ(&a, &b)
    })
}

impl FieldHandler for BlockGroupHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, field: &Field) -> bool {
        field.kind.is_block_group()
    }

    fn export(&self, field: &Field, value: &FieldValue) -> Result<Exported> {
        let blocks = match value {
            FieldValue::Blocks(blocks) => blocks,
            FieldValue::Null => return Ok(Exported::Value(Value::Array(Vec::new()))),
            other => return Ok(Exported::Value(other.to_plain_json())),
        };

        let registry = self.registry(&field.handle)?;
        let exported = blocks
            .iter()
            .map(|block| self.export_block(&registry, field, block))
            .collect::<Result<Vec<_>>>()?;
        Ok(Exported::Value(Value::Array(exported)))
    }

    /// Every block must be supplied: the host replaces the whole list.
    fn import(&self, field: &Field, value: &Value, ctx: &ImportContext) -> Result<FieldValue> {
        let items = as_block_list(value).ok_or_else(|| {
            Error::field(
                &ctx.field_path,
                format!("expected an array of blocks, got {}", json_type_name(value)),
            )
        })?;

        let registry = self.registry(&field.handle)?;
        let blocks = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| self.import_block(&registry, field, i, item, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(FieldValue::Blocks(blocks))
    }

    fn has_changed(&self, _field: &Field, old: &Value, new: &Value) -> Result<bool> {
        let (Some(old), Some(new)) = (as_block_list(old), as_block_list(new)) else {
            return Ok(true);
        };
        if old.len() != new.len() {
            return Ok(true);
        }
        Ok(old.iter().zip(&new).any(|(a, b)| block_differs(a, b)))
    }

    fn priority(&self) -> i32 {
        100
    }

    fn placeholder(&self, handle: &str) -> Field {
        Field::optional(handle, FieldKind::Matrix)
    }
}
