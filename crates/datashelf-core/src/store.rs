//! Dataset store backed by a single JSON index file.
//!
//! The whole collection lives in memory and is written back to disk after
//! every successful upsert. The file is read exactly once, at startup.

use crate::error::{CatalogError, Result};
use crate::models::Dataset;
use crate::persist::{read_json, write_json};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// In-memory dataset collection mirrored to a JSON array on disk.
pub struct DatasetStore {
    path: PathBuf,
    records: RwLock<Vec<Dataset>>,
}

impl DatasetStore {
    /// Load the store from its backing file.
    ///
    /// Fails if the file is missing, is not a JSON array, or holds a record
    /// without a string `uuid`. There is no partial-start mode.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values: Vec<Value> = match read_json(&path) {
            Ok(Some(values)) => values,
            Ok(None) => {
                return Err(CatalogError::Config {
                    message: format!("Datasets file {} does not exist", path.display()),
                })
            }
            Err(e) => {
                return Err(CatalogError::Config {
                    message: format!("Failed to load datasets file: {}", e),
                })
            }
        };

        let mut records = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let record = Dataset::from_value(value)
                .filter(|ds| ds.uuid().is_some())
                .ok_or_else(|| CatalogError::Config {
                    message: format!(
                        "Record {} in {} is not an object with a string uuid",
                        index,
                        path.display()
                    ),
                })?;
            records.push(record);
        }

        info!("Loaded {} datasets from {}", records.len(), path.display());
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find a dataset by uuid.
    pub async fn find(&self, uuid: &str) -> Option<Dataset> {
        let records = self.records.read().await;
        records.iter().find(|ds| ds.uuid() == Some(uuid)).cloned()
    }

    pub async fn contains(&self, uuid: &str) -> bool {
        let records = self.records.read().await;
        records.iter().any(|ds| ds.uuid() == Some(uuid))
    }

    /// Snapshot of the full collection, in store order.
    pub async fn list(&self) -> Vec<Dataset> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Insert or replace a dataset by uuid, then persist the collection.
    ///
    /// A replaced record is removed and the new one appended, so it moves to
    /// the end. If persisting fails the in-memory change is undone.
    pub async fn upsert(&self, record: Dataset) -> Result<Dataset> {
        let uuid = record
            .uuid()
            .ok_or_else(|| CatalogError::Json {
                message: "Dataset record has no uuid".to_string(),
                source: None,
            })?
            .to_string();

        let mut records = self.records.write().await;
        let previous = records
            .iter()
            .position(|ds| ds.uuid() == Some(uuid.as_str()))
            .map(|index| (index, records.remove(index)));
        records.push(record.clone());

        if let Err(e) = self.persist(&records) {
            warn!("Rolling back dataset {} after persist failure: {}", uuid, e);
            records.pop();
            if let Some((index, old)) = previous {
                records.insert(index, old);
            }
            return Err(CatalogError::Persist {
                message: e.to_string(),
                path: self.path.clone(),
                source: Some(Box::new(e)),
            });
        }

        debug!(
            "Upserted dataset {} ({}), {} datasets stored",
            uuid,
            if previous.is_some() { "replaced" } else { "new" },
            records.len()
        );
        Ok(record)
    }

    fn persist(&self, records: &[Dataset]) -> Result<()> {
        write_json(&self.path, records)
    }
}
