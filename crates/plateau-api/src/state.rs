//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Cloning is cheap: every field is a handle.

use std::sync::Arc;

use plateau_archive::ArchiveStore;

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::records::{AssetRecords, InMemoryAssetRecords};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub archives: ArchiveStore,
    pub records: Arc<dyn AssetRecords>,
    pub metrics: ApiMetrics,
}

impl AppState {
    /// State with in-memory records and archives under `config.archive_root`.
    pub fn new(config: AppConfig) -> Self {
        Self::with_records(config, Arc::new(InMemoryAssetRecords::new()))
    }

    /// State backed by the given record store.
    pub fn with_records(config: AppConfig, records: Arc<dyn AssetRecords>) -> Self {
        Self {
            archives: ArchiveStore::new(&config.archive_root),
            config: Arc::new(config),
            records,
            metrics: ApiMetrics::new(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("archives", &self.archives.root())
            .field("records", &self.records.len())
            .finish()
    }
}
