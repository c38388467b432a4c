//! Mapping dataset file references onto the storage root.

use crate::error::{CatalogError, Result};
use crate::models::Dataset;
use std::path::{Component, Path, PathBuf};

/// Directory holding the committed files of one dataset.
pub fn dataset_dir(storage_root: &Path, uuid: &str) -> PathBuf {
    storage_root.join(uuid)
}

/// Resolve a file listed by a dataset to its location on disk.
///
/// The path must be listed verbatim in `files[].path` and must exist as a
/// regular file under the dataset's directory. The two failures are reported
/// as different errors.
pub async fn resolve(storage_root: &Path, dataset: &Dataset, relative_path: &str) -> Result<PathBuf> {
    let id = dataset.uuid().unwrap_or_default();

    if !dataset.lists_file(relative_path) {
        return Err(CatalogError::FileNotListed {
            id: id.to_string(),
            path: relative_path.to_string(),
        });
    }

    if !is_plain_file_name(relative_path) || !is_plain_file_name(id) {
        return Err(CatalogError::InvalidFilePath {
            path: relative_path.to_string(),
        });
    }

    let full_path = dataset_dir(storage_root, id).join(relative_path);
    match tokio::fs::metadata(&full_path).await {
        Ok(meta) if meta.is_file() => Ok(full_path),
        _ => Err(CatalogError::FileMissing {
            id: id.to_string(),
            path: relative_path.to_string(),
        }),
    }
}

/// Reduce a client-supplied upload file name to a safe single component.
///
/// Directory parts are dropped; empty names, `.` and `..` are rejected.
pub fn file_name_for_upload(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    is_plain_file_name(last).then(|| last.to_string())
}

/// Whether `name` is exactly one normal path component.
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
