//! Centralized configuration for Datashelf.
//!
//! Fixed names and limits live here as associated constants; the publisher
//! identity stamped onto every ingested dataset is loaded from a JSON file
//! once at startup.

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const DEFAULT_CONFIG_FILE: &'static str = "datashelf.config";
    pub const DEFAULT_LOG_FILE: &'static str = "datashelf-server.log";
    pub const DEFAULT_PORT: u16 = 80;
}

/// Data directory layout.
pub struct PathsConfig;

impl PathsConfig {
    pub const DATA_DIR_NAME: &'static str = "datasets";
    pub const INDEX_FILE_NAME: &'static str = "datasets.json";
    pub const STAGING_DIR_NAME: &'static str = ".staging";
    pub const STAGING_FILE_PREFIX: &'static str = "upload-";
}

/// Limits applied to publish requests.
pub struct UploadConfig;

impl UploadConfig {
    pub const MANIFEST_FIELD: &'static str = "manifest";
    pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024; // 1 GiB
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
}

/// Publisher identity copied onto every ingested dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub cloud_name: String,
    pub creator_uuid: String,
    pub creator_name: String,
}

impl PublisherConfig {
    /// Load the publisher configuration from a JSON document.
    ///
    /// A missing or malformed file is an error; callers treat it as fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&contents).map_err(|e| CatalogError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }
}
