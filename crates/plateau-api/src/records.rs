//! # Asset Records
//!
//! Metadata for each archived asset, and the [`AssetRecords`] seam through
//! which the service reads and writes it. The archive itself is addressed
//! by `(file_link, purpose)`; the record is addressed by `id`.
//!
//! One record owns one archive: storing a record for a `(file_link,
//! purpose)` pair that already has one displaces the old record, matching
//! the archive writer's last-writer-wins replacement.

use plateau_core::{paginate, AssetKey, Page, PageRequest, Purpose, Timestamp};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::Store;

/// Metadata describing one archived asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetRecord {
    pub id: Uuid,
    /// Subject name as uploaded, before normalization.
    pub subject_name: String,
    #[schema(value_type = String, example = "profile_picture")]
    pub purpose: Purpose,
    /// Normalized asset key locating the archive.
    #[schema(value_type = String, example = "jane_doe")]
    pub file_link: AssetKey,
    /// Free-form label used to filter listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content type sniffed at upload.
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: Timestamp,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: Timestamp,
}

impl AssetRecord {
    /// Whether this record owns the archive for `key` under `purpose`.
    pub fn owns(&self, key: &AssetKey, purpose: Purpose) -> bool {
        self.file_link == *key && self.purpose == purpose
    }
}

/// Listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub role: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AssetRecord) -> bool {
        match &self.role {
            Some(role) => record.role.as_deref() == Some(role.as_str()),
            None => true,
        }
    }
}

/// Changes applied by an update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// `Some(None)` clears the role.
    pub role: Option<Option<String>>,
}

impl RecordPatch {
    pub fn apply(&self, record: &mut AssetRecord) {
        if let Some(role) = &self.role {
            record.role = role.clone();
        }
        record.updated_at = Timestamp::now();
    }
}

/// Storage for asset records.
pub trait AssetRecords: Send + Sync {
    /// Store `record`, displacing any record that owns the same archive.
    /// Returns the displaced records.
    fn store(&self, record: AssetRecord) -> Vec<AssetRecord>;

    /// One page of records matching `filter`, newest first.
    fn fetch_page(&self, filter: &RecordFilter, page: &PageRequest) -> Page<AssetRecord>;

    fn get_by_id(&self, id: &Uuid) -> Option<AssetRecord>;

    fn update_by_id(&self, id: &Uuid, patch: &RecordPatch) -> Option<AssetRecord>;

    fn remove_by_id(&self, id: &Uuid) -> Option<AssetRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local [`AssetRecords`] backed by a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetRecords {
    records: Store<AssetRecord>,
}

impl InMemoryAssetRecords {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetRecords for InMemoryAssetRecords {
    fn store(&self, record: AssetRecord) -> Vec<AssetRecord> {
        let key = record.file_link.clone();
        let purpose = record.purpose;
        self.records
            .replace_where(record.id, record, |existing| existing.owns(&key, purpose))
    }

    fn fetch_page(&self, filter: &RecordFilter, page: &PageRequest) -> Page<AssetRecord> {
        let matching = self
            .records
            .list()
            .into_iter()
            .filter(|r| filter.matches(r));
        paginate(matching, |r| r.created_at, page)
    }

    fn get_by_id(&self, id: &Uuid) -> Option<AssetRecord> {
        self.records.get(id)
    }

    fn update_by_id(&self, id: &Uuid, patch: &RecordPatch) -> Option<AssetRecord> {
        self.records.update(id, |r| patch.apply(r))
    }

    fn remove_by_id(&self, id: &Uuid) -> Option<AssetRecord> {
        self.records.remove(id)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
