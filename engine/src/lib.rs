//! # Fieldbridge Engine
//!
//! Exports a content entry to a flat JSON document and merges an edited
//! copy of that document back into a draft, writing only the fields that
//! actually changed.
//!
//! ## Design Principles
//!
//! - **No IO**: storage, layouts, drafts and persistence belong to a
//!   [`ContentHost`]; the engine only talks to that trait
//! - **Field-level isolation**: one broken field never aborts a whole
//!   export or import, it is logged and skipped
//! - **No-op imports are free**: when nothing changed, no draft is created
//!
//! ## Core Concepts
//!
//! ### Field handlers
//!
//! Each [`FieldHandler`] owns one family of fields (options, relations,
//! assets, links, SEO bundles, block groups, and a catch-all default). It
//! exports a live [`FieldValue`] to JSON, imports JSON back, and decides
//! whether an incoming value differs from the current one.
//!
//! ### Registry
//!
//! The [`HandlerRegistry`] picks a handler per field by descending priority
//! and caches the choice per field type. Handlers below priority 50 may use
//! the host's native serialization instead of their own.
//!
//! ### Hint envelopes
//!
//! Values nested in block groups are exported as
//! `{"__handler": name, "__value": value}` so they can be imported again
//! without the block's layout. Values without a hint fall back to shape
//! detection.
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldbridge_engine::{
//!     Exporter, Field, FieldKind, FieldLayout, FieldValue, HandlerRegistry, Importer,
//!     MemoryStore, Record, StoreSnapshot,
//! };
//! use serde_json::json;
//!
//! // 1. Describe the content
//! let mut snapshot = StoreSnapshot::new();
//! snapshot.add_layout(FieldLayout::new(
//!     "page",
//!     vec![
//!         Field::optional("summary", FieldKind::PlainText),
//!         Field::optional("related", FieldKind::Entries),
//!     ],
//! ));
//! snapshot.add_record(
//!     Record::new(123, 1, "page")
//!         .with_title("Page Title")
//!         .with_field("related", FieldValue::Relations(vec![5, 9])),
//! );
//!
//! // 2. Build a host and a registry
//! let store = MemoryStore::new(snapshot);
//! let registry = HandlerRegistry::bootstrap(&store);
//!
//! // 3. Export
//! let doc = Exporter::new(&store, &registry).export_by_id(123, 1).unwrap();
//! assert_eq!(doc.fields["related"], json!([5, 9]));
//!
//! // 4. Edit and import
//! let mut payload = doc.to_wire();
//! payload[0]["title"] = json!("New Title");
//! let result = Importer::new(&store, &registry)
//!     .import_record(&payload, None)
//!     .unwrap();
//! assert!(result.success);
//! assert_eq!(result.updated_fields, Some(vec!["title".to_string()]));
//! ```

pub mod error;
pub mod export;
pub mod field;
pub mod handler;
pub mod host;
pub mod import;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod value;

// Re-export main types at crate root
pub use error::{Error, ErrorKind, ValidationErrors};
pub use export::{ExportDocument, ExportMetadata, Exporter};
pub use field::{BlockType, Field, FieldKind, FieldLayout, OptionDef};
pub use handler::{
    AssetHandler, BlockGroupHandler, DefaultHandler, Exported, FieldHandler, ImportContext,
    LinkHandler, OptionsHandler, RelationHandler, SeoHandler,
};
pub use host::ContentHost;
pub use import::{ChangeSet, ImportDocument, ImportResult, Importer};
pub use record::{Record, Scenario};
pub use registry::HandlerRegistry;
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::MemoryStore;
pub use value::{AssetRef, Block, FieldValue, LinkValue, ObjectValue, OptionValue};

/// Type aliases for clarity
pub type RecordId = u64;
pub type SiteId = u64;
pub type UserId = u64;

/// Site used when a payload names none.
pub const DEFAULT_SITE_ID: SiteId = 1;
