//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use fieldbridge_engine::{
    field::SEO_FIELD_SIGNATURE, AssetRef, Block, BlockType, Exporter, Field, FieldKind,
    FieldLayout, FieldValue, HandlerRegistry, LinkValue, MemoryStore, OptionDef, OptionValue,
    Record, StoreSnapshot,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const ENTRY_ID: u64 = 123;

fn block_types() -> Vec<BlockType> {
    vec![
        BlockType::new(
            "text",
            vec![
                Field::optional("body", FieldKind::PlainText),
                Field::optional("tags", FieldKind::Tags),
                Field::optional("image", FieldKind::Assets),
            ],
        ),
        BlockType::new(
            "callout",
            vec![
                Field::optional("tone", FieldKind::Dropdown).with_options(vec![
                    OptionDef::new("warm", "Warm"),
                    OptionDef::new("cool", "Cool"),
                ]),
                Field::optional("link", FieldKind::Link),
            ],
        ),
        BlockType::new(
            "section",
            vec![
                Field::optional("heading", FieldKind::PlainText),
                Field::optional("children", FieldKind::Matrix).with_block_types(vec![BlockType::new(
                    "text",
                    vec![
                        Field::optional("body", FieldKind::PlainText),
                        Field::optional("tags", FieldKind::Tags),
                    ],
                )]),
            ],
        ),
    ]
}

pub fn page_layout() -> FieldLayout {
    FieldLayout::new(
        "page",
        vec![
            Field::required("summary", FieldKind::PlainText),
            Field::optional("count", FieldKind::Number),
            Field::optional("featured", FieldKind::Lightswitch),
            Field::optional("published", FieldKind::Date),
            Field::optional("color", FieldKind::Dropdown).with_options(vec![
                OptionDef::new("red", "Red"),
                OptionDef::new("blue", "Blue"),
            ]),
            Field::optional("topics", FieldKind::Checkboxes).with_options(vec![
                OptionDef::new("news", "News"),
                OptionDef::new("events", "Events"),
                OptionDef::new("jobs", "Jobs"),
            ]),
            Field::optional("related", FieldKind::Entries),
            Field::optional("hero", FieldKind::Assets),
            Field::optional("cta", FieldKind::Link),
            Field::optional("seo", FieldKind::Custom(SEO_FIELD_SIGNATURE.to_string())),
            Field::optional("content", FieldKind::Matrix).with_block_types(block_types()),
        ],
    )
}

pub fn content_blocks() -> Vec<Block> {
    vec![
        Block::new("text")
            .with_title("Intro")
            .with_field("body", FieldValue::text("Hello world"))
            .with_field("tags", FieldValue::Relations(vec![11, 12]))
            .with_field("image", FieldValue::Assets(vec![asset(40)])),
        Block::new("callout")
            .with_field(
                "tone",
                FieldValue::Choice(Some(OptionValue::new("warm", "Warm"))),
            )
            .with_field(
                "link",
                FieldValue::Link(Some(
                    LinkValue::url("url", "https://example.com").with_label("Example"),
                )),
            ),
        Block::new("section")
            .with_field("heading", FieldValue::text("More"))
            .with_field(
                "children",
                FieldValue::Blocks(vec![Block::new("text")
                    .with_field("body", FieldValue::text("Nested"))
                    .with_field("tags", FieldValue::Relations(vec![13]))]),
            ),
    ]
}

pub fn asset(id: u64) -> AssetRef {
    AssetRef {
        id,
        url: Some(format!("/uploads/{id}.jpg")),
        title: Some(format!("Image {id}")),
        alt: Some(format!("Alt {id}")),
    }
}

pub fn page_record() -> Record {
    let mut about = LinkValue::element("entry", 9);
    about.url = Some("http://localhost/company/about".into());

    Record::new(ENTRY_ID, 1, "page")
        .with_title("Page Title")
        .with_uri("page", "company/page")
        .with_field("summary", FieldValue::text("A short summary"))
        .with_field("count", FieldValue::Scalar(json!(3)))
        .with_field("featured", FieldValue::Scalar(json!(true)))
        .with_field(
            "published",
            FieldValue::Date(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()),
        )
        .with_field(
            "color",
            FieldValue::Choice(Some(OptionValue::new("red", "Red"))),
        )
        .with_field(
            "topics",
            FieldValue::Choices(vec![
                OptionValue::new("news", "News"),
                OptionValue::new("events", "Events"),
            ]),
        )
        .with_field("related", FieldValue::Relations(vec![5, 9]))
        .with_field("hero", FieldValue::Assets(vec![asset(40)]))
        .with_field("cta", FieldValue::Link(Some(about.with_label("About us"))))
        .with_field(
            "seo",
            FieldValue::Seo(json!({
                "metaGlobalVars": {
                    "seoTitle": "Page Title | Acme",
                    "seoDescription": "",
                    "ogTitle": "{{ entry.title }}"
                }
            })),
        )
        .with_field("content", FieldValue::Blocks(content_blocks()))
}

pub fn snapshot() -> StoreSnapshot {
    let mut snapshot = StoreSnapshot::new();
    snapshot.enable_integration("seomatic");
    snapshot.add_layout(page_layout());
    snapshot.add_record(page_record());
    for (id, title, uri) in [(5, "News", "news"), (7, "Jobs", "jobs"), (9, "About", "company/about")] {
        snapshot.add_record(Record::new(id, 1, "page").with_title(title).with_uri(uri, uri));
    }
    for id in [40, 41, 42] {
        snapshot.add_asset(asset(id));
    }
    snapshot
}

pub fn setup() -> (MemoryStore, Arc<HandlerRegistry>) {
    let store = MemoryStore::new(snapshot());
    let registry = HandlerRegistry::bootstrap(&store);
    (store, registry)
}

/// Wire export of the fixture entry.
pub fn exported(store: &MemoryStore, registry: &HandlerRegistry) -> Value {
    Exporter::new(store, registry)
        .export_by_id(ENTRY_ID, 1)
        .unwrap()
        .to_wire()
}
