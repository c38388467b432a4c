//! The catalog facade tying the store, file layout and publisher identity
//! together.

use crate::config::{PathsConfig, PublisherConfig};
use crate::error::{CatalogError, Result};
use crate::ingest;
use crate::models::Dataset;
use crate::resolve;
use crate::store::DatasetStore;
use crate::upload::UploadSession;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

/// Dataset catalog rooted at a data directory.
///
/// Layout under the root:
/// - `datasets.json`: the store's backing file
/// - `<uuid>/`: committed files of each dataset
/// - `.staging/`: temp files of in-flight uploads
pub struct DatasetCatalog {
    storage_root: PathBuf,
    publisher: PublisherConfig,
    store: DatasetStore,
}

impl DatasetCatalog {
    /// Open the catalog, loading `datasets.json` from the storage root.
    ///
    /// Leftover staging files from a previous run are removed.
    pub fn open(storage_root: impl Into<PathBuf>, publisher: PublisherConfig) -> Result<Self> {
        let storage_root = storage_root.into();
        let store = DatasetStore::load(storage_root.join(PathsConfig::INDEX_FILE_NAME))?;

        let staging = storage_root.join(PathsConfig::STAGING_DIR_NAME);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)
                .map_err(|e| CatalogError::io_with_path(e, &staging))?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| CatalogError::io_with_path(e, &staging))?;

        info!(
            "Opened catalog at {} for {}",
            storage_root.display(),
            publisher.cloud_name
        );
        Ok(Self {
            storage_root,
            publisher,
            store,
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.storage_root.join(PathsConfig::STAGING_DIR_NAME)
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// List datasets, keeping those whose top-level string fields equal
    /// every `(field, value)` filter.
    pub async fn list(&self, filters: &[(String, String)]) -> Vec<Dataset> {
        let records = self.store.list().await;
        if filters.is_empty() {
            return records;
        }
        records
            .into_iter()
            .filter(|ds| ds.matches(filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
            .collect()
    }

    pub async fn get(&self, id: &str) -> Result<Dataset> {
        self.store
            .find(id)
            .await
            .ok_or_else(|| CatalogError::DatasetNotFound { id: id.to_string() })
    }

    /// Locate a file of a dataset on disk.
    pub async fn resolve_file(&self, id: &str, path: &str) -> Result<PathBuf> {
        let dataset = self.get(id).await?;
        resolve::resolve(&self.storage_root, &dataset, path).await
    }

    /// Ingest a manifest document for `expected_uuid`.
    pub async fn ingest(&self, manifest: &[u8], expected_uuid: &str) -> Result<Dataset> {
        ingest::ingest(&self.store, &self.publisher, manifest, expected_uuid).await
    }

    /// Start a publish session for one dataset id.
    pub fn begin_upload(&self, id: &str) -> Result<UploadSession<'_>> {
        // The id becomes a directory name next to the index and staging area
        if resolve::file_name_for_upload(id).as_deref() != Some(id)
            || id.starts_with('.')
            || id == PathsConfig::INDEX_FILE_NAME
        {
            return Err(CatalogError::InvalidFilePath {
                path: id.to_string(),
            });
        }
        debug!("Starting upload for dataset {}", id);
        Ok(UploadSession::new(self, id.to_string()))
    }

    /// Create an empty staging file for an incoming part.
    pub fn stage_file(&self) -> Result<TempPath> {
        let dir = self.staging_dir();
        tempfile::Builder::new()
            .prefix(PathsConfig::STAGING_FILE_PREFIX)
            .tempfile_in(&dir)
            .map(|file| file.into_temp_path())
            .map_err(|e| CatalogError::io_with_path(e, dir))
    }
}
