//! Hint envelopes on nested block values, and the shape-guessing fallback
//! used when they are missing.
//!
//! Unhinted values go through the block layout when it knows the key. Shape
//! guessing covers the rest and is best effort: the misclassification tests
//! below pin down known ambiguous shapes rather than assert they come out right.

mod common;

use common::{exported, page_layout, setup};
use fieldbridge_engine::{
    handler::{strip_hints, unwrap_hint, ImportContext},
    Block, BlockType, Field, FieldHandler, FieldKind, FieldValue, HandlerRegistry, Importer,
    OptionValue,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn content_field() -> Field {
    page_layout().field("content").unwrap().clone()
}

fn import_content(registry: &HandlerRegistry, payload: &Value) -> Vec<Block> {
    let field = content_field();
    let handler: Arc<dyn FieldHandler> = registry.get_handler(&field).unwrap();
    let ctx = ImportContext::new(1, None, "content");
    match handler.import(&field, payload, &ctx).unwrap() {
        FieldValue::Blocks(blocks) => blocks,
        other => panic!("expected blocks, got {other:?}"),
    }
}

/// A single block with one nested value.
fn one_block(block_type: &str, key: &str, value: Value) -> Value {
    json!([{ "type": block_type, key: value }])
}

// ============================================================================
// Hint robustness
// ============================================================================

#[test]
fn stripping_any_single_hint_still_imports() {
    let (store, registry) = setup();
    let content = exported(&store, &registry)[0]["content"].clone();

    let mut stripped_count = 0;
    for (i, block) in content.as_array().unwrap().iter().enumerate() {
        for (key, value) in block.as_object().unwrap() {
            if unwrap_hint(value).is_none() {
                continue;
            }
            let mut edited = content.clone();
            edited[i][key] = strip_hints(value);
            stripped_count += 1;

            let blocks = import_content(&registry, &edited);
            assert_eq!(blocks.len(), 3, "{key}");
            assert!(blocks[i].fields.contains_key(key.as_str()), "{key}");
        }
    }
    assert!(stripped_count >= 4);
}

#[test]
fn fully_unhinted_payload_imports() {
    let (store, registry) = setup();
    let mut payload = exported(&store, &registry);
    payload[0]["content"] = strip_hints(&payload[0]["content"]);

    // Unhinted values compare equal to the hinted baseline
    let changes = Importer::new(&store, &registry)
        .detect_changes(&payload)
        .unwrap();
    assert!(changes.is_empty());

    let blocks = import_content(&registry, &payload[0]["content"]);
    assert_eq!(blocks.len(), 3);
}

#[test]
fn unknown_hint_falls_back_to_layout() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block(
        "text",
        "tags",
        json!({"__handler": "gallery", "__value": ["3", 1]}),
    );

    let blocks = import_content(&registry, &payload);
    assert_eq!(blocks[0].fields["tags"], FieldValue::Relations(vec![3, 1]));
}

#[test]
fn unknown_hint_on_unknown_key_falls_back_to_shape() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block(
        "text",
        "cover",
        json!({"__handler": "gallery", "__value": {"id": 40, "url": "/a.jpg"}}),
    );

    let blocks = import_content(&registry, &payload);
    assert_eq!(blocks[0].fields["cover"], FieldValue::Assets(vec![fieldbridge_engine::AssetRef::from_id(40)]));
}

#[test]
fn hint_without_value_imports_empty() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block("text", "tags", json!({"__handler": "relation"}));

    let blocks = import_content(&registry, &payload);
    assert_eq!(blocks[0].fields["tags"], FieldValue::Relations(vec![]));
}

#[test]
fn hint_outranks_layout() {
    let registry = HandlerRegistry::with_defaults(false);
    // `body` is plain text in the layout, but the hint names the relation handler
    let payload = one_block("text", "body", json!({"__handler": "relation", "__value": [1, 2]}));

    let blocks = import_content(&registry, &payload);
    assert_eq!(blocks[0].fields["body"], FieldValue::Relations(vec![1, 2]));
}

#[test]
fn unknown_block_type_still_imports() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block(
        "gallery",
        "caption",
        json!({"__handler": "options", "__value": [{"value": "a", "label": "A"}]}),
    );

    let blocks = import_content(&registry, &payload);
    assert_eq!(blocks[0].block_type, "gallery");
    assert_eq!(
        blocks[0].fields["caption"],
        FieldValue::Choices(vec![OptionValue::new("a", "A")])
    );
}

// ============================================================================
// Shape guessing
// ============================================================================

#[test]
fn unhinted_shapes_that_guess_right() {
    let registry = HandlerRegistry::with_defaults(false);

    let blocks = import_content(
        &registry,
        &one_block("callout", "tone", json!({"value": "warm", "label": "Warm"})),
    );
    assert_eq!(
        blocks[0].fields["tone"],
        FieldValue::Choice(Some(OptionValue::new("warm", "Warm")))
    );

    let blocks = import_content(
        &registry,
        &one_block("callout", "link", json!({"type": "url", "url": "https://a.test"})),
    );
    assert!(matches!(&blocks[0].fields["link"], FieldValue::Link(Some(l)) if l.url.as_deref() == Some("https://a.test")));

    let blocks = import_content(&registry, &one_block("text", "body", json!(" plain ")));
    assert_eq!(blocks[0].fields["body"], FieldValue::text(" plain "));

    // Bare id lists are not guessed; without a layout they pass through as scalars
    let blocks = import_content(&registry, &one_block("gallery", "tags", json!([11, 12])));
    assert_eq!(blocks[0].fields["tags"], FieldValue::Scalar(json!([11, 12])));
}

// ============================================================================
// Unhinted values in known layouts
// ============================================================================

#[test]
fn unhinted_values_use_the_block_layout() {
    let registry = HandlerRegistry::with_defaults(false);
    let field = Field::optional("content", FieldKind::Matrix).with_block_types(vec![BlockType::new(
        "text",
        vec![
            Field::optional("when", FieldKind::Date),
            Field::optional("count", FieldKind::Number),
            Field::optional("shown", FieldKind::Lightswitch),
            Field::optional("tags", FieldKind::Tags),
        ],
    )]);
    let handler = registry.get_handler(&field).unwrap();
    let payload = json!([{
        "type": "text",
        "when": "2024-01-02",
        "count": "5",
        "shown": "1",
        "tags": [3, 1]
    }]);

    let ctx = ImportContext::new(1, None, "content");
    let FieldValue::Blocks(blocks) = handler.import(&field, &payload, &ctx).unwrap() else {
        panic!("expected blocks");
    };
    let fields = &blocks[0].fields;
    assert!(matches!(fields["when"], FieldValue::Date(_)), "{:?}", fields["when"]);
    assert_eq!(fields["count"], FieldValue::Scalar(json!(5)));
    assert_eq!(fields["shown"], FieldValue::Scalar(json!(true)));
    assert_eq!(fields["tags"], FieldValue::Relations(vec![3, 1]));
}

#[test]
fn unhinted_nested_blocks_in_known_layout() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block(
        "section",
        "children",
        json!([{"type": "text", "body": "Nested", "tags": [13]}]),
    );

    let blocks = import_content(&registry, &payload);
    let FieldValue::Blocks(children) = &blocks[0].fields["children"] else {
        panic!("expected nested blocks, got {:?}", blocks[0].fields["children"]);
    };
    assert_eq!(children[0].fields["tags"], FieldValue::Relations(vec![13]));
}

#[test]
fn misclassified_element_link_with_id() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block(
        "banner",
        "link",
        json!({"id": 9, "type": "entry", "element": 9}),
    );

    // Outside a known layout, anything carrying `id` looks like an asset
    let blocks = import_content(&registry, &payload);
    assert!(matches!(blocks[0].fields["link"], FieldValue::Assets(_)));
}

#[test]
fn misclassified_nested_blocks() {
    let registry = HandlerRegistry::with_defaults(false);
    let payload = one_block(
        "banner",
        "children",
        json!([{"type": "text", "body": "Nested"}]),
    );

    // Without the hint or a layout, nested blocks look like a list of links
    let blocks = import_content(&registry, &payload);
    let FieldValue::Links(links) = &blocks[0].fields["children"] else {
        panic!("expected links, got {:?}", blocks[0].fields["children"]);
    };
    assert_eq!(links[0].link_type, "text");
}
