//! Serializable state of the in-memory content store.
//!
//! Uses BTreeMap/BTreeSet throughout so that a snapshot serializes the same
//! way every time.

use crate::{error::Result, AssetRef, Error, FieldLayout, Record, RecordId, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_CP_URL: &str = "http://localhost/admin";
pub const DEFAULT_SITE_URL: &str = "http://localhost";

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

fn default_cp_url() -> String {
    DEFAULT_CP_URL.to_string()
}

fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_next_draft_id() -> u64 {
    1
}

/// Everything the in-memory store knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Control panel base URL for draft edit links
    #[serde(default = "default_cp_url")]
    pub cp_url: String,
    /// Public base URL element links resolve against
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Enabled integrations by name
    #[serde(default)]
    pub integrations: BTreeSet<String>,
    /// Field layouts by handle
    #[serde(default)]
    pub layouts: BTreeMap<String, FieldLayout>,
    /// Canonical records by site, then by id
    #[serde(default)]
    pub records: BTreeMap<SiteId, BTreeMap<RecordId, Record>>,
    /// Asset library used to fill in imported asset references
    #[serde(default)]
    pub assets: BTreeMap<RecordId, AssetRef>,
    /// Saved drafts by draft id
    #[serde(default)]
    pub drafts: BTreeMap<u64, Record>,
    #[serde(default = "default_next_draft_id")]
    pub next_draft_id: u64,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            cp_url: default_cp_url(),
            site_url: default_site_url(),
            integrations: BTreeSet::new(),
            layouts: BTreeMap::new(),
            records: BTreeMap::new(),
            assets: BTreeMap::new(),
            drafts: BTreeMap::new(),
            next_draft_id: default_next_draft_id(),
        }
    }

    pub fn add_layout(&mut self, layout: FieldLayout) {
        self.layouts.insert(layout.handle.clone(), layout);
    }

    pub fn add_record(&mut self, record: Record) {
        self.records
            .entry(record.site_id)
            .or_default()
            .insert(record.id, record);
    }

    pub fn add_asset(&mut self, asset: AssetRef) {
        self.assets.insert(asset.id, asset);
    }

    pub fn enable_integration(&mut self, name: impl Into<String>) {
        self.integrations.insert(name.into());
    }

    pub fn get_record(&self, id: RecordId, site_id: SiteId) -> Option<&Record> {
        self.records.get(&site_id)?.get(&id)
    }

    /// Count records across all sites.
    pub fn record_count(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    /// Check that every record refers to a known layout.
    pub fn validate(&self) -> Result<()> {
        let records = self
            .records
            .values()
            .flat_map(BTreeMap::values)
            .chain(self.drafts.values());
        for record in records {
            if !self.layouts.contains_key(&record.layout) {
                return Err(Error::InvalidSnapshot(format!(
                    "record {} uses unknown layout '{}'",
                    record.id, record.layout
                )));
            }
        }
        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        snapshot.validate()?;
        Ok(snapshot)
    }
}
