//! Publish pipeline for one multipart upload.
//!
//! Parts are staged to temp files by the transport and handed to an
//! [`UploadSession`] one at a time. Each part is committed or discarded as
//! soon as it arrives, based on the manifest outcome known at that moment:
//!
//! ```text
//! AwaitingManifest --manifest part--> Deciding --finish--> Done
//!        |                              |  ^
//!        +---------- finish ------------+--+ (later manifest parts re-ingest)
//! ```

use crate::catalog::DatasetCatalog;
use crate::config::UploadConfig;
use crate::error::{CatalogError, Result};
use crate::models::Dataset;
use crate::resolve::{dataset_dir, file_name_for_upload};
use std::path::PathBuf;
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// One multipart part, already written to a staging file.
#[derive(Debug)]
pub struct StagedPart {
    /// Form field name; `"manifest"` marks the manifest document.
    pub field_name: String,
    /// Client-supplied file name, if the part carried one.
    pub file_name: Option<String>,
    /// Staged contents. Dropping it deletes the file.
    pub temp: TempPath,
}

/// What happened to a staged part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Committed(PathBuf),
    Discarded,
}

/// Observable phase of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    AwaitingManifest,
    Deciding,
    Done,
}

enum UploadState {
    AwaitingManifest,
    Deciding { manifest_error: Option<CatalogError> },
    Done,
}

/// State machine driving a single `PUT /datasets/:id` request.
pub struct UploadSession<'a> {
    catalog: &'a DatasetCatalog,
    dataset_id: String,
    state: UploadState,
    committed: usize,
    discarded: usize,
}

impl<'a> UploadSession<'a> {
    pub(crate) fn new(catalog: &'a DatasetCatalog, dataset_id: String) -> Self {
        Self {
            catalog,
            dataset_id,
            state: UploadState::AwaitingManifest,
            committed: 0,
            discarded: 0,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        match self.state {
            UploadState::AwaitingManifest => UploadPhase::AwaitingManifest,
            UploadState::Deciding { .. } => UploadPhase::Deciding,
            UploadState::Done => UploadPhase::Done,
        }
    }

    /// Process one staged part and decide its disposition immediately.
    ///
    /// A part named `manifest` is ingested first; it is then committed or
    /// discarded like any other part. Only commit I/O failures are returned
    /// as errors; manifest failures are held until [`finish`](Self::finish).
    pub async fn accept(&mut self, part: StagedPart) -> Result<Disposition> {
        debug!(
            "Received part '{}' ({:?}) for dataset {}",
            part.field_name, part.file_name, self.dataset_id
        );

        if part.field_name == UploadConfig::MANIFEST_FIELD {
            let manifest_error = self.ingest_manifest(&part).await.err();
            self.state = UploadState::Deciding { manifest_error };
        }

        if self.should_discard().await {
            return self.discard(part);
        }
        self.commit(part).await
    }

    /// Close the session and produce the response outcome.
    ///
    /// `transport` carries the multipart parser's failure, if any.
    pub async fn finish(mut self, transport: std::result::Result<(), String>) -> Result<Dataset> {
        let state = std::mem::replace(&mut self.state, UploadState::Done);
        info!(
            "Upload for dataset {} finished: {} committed, {} discarded",
            self.dataset_id, self.committed, self.discarded
        );

        if let Err(message) = transport {
            return Err(CatalogError::Transport { message });
        }
        if let UploadState::Deciding {
            manifest_error: Some(err),
        } = state
        {
            return Err(err);
        }
        self.catalog
            .store()
            .find(&self.dataset_id)
            .await
            .ok_or_else(|| CatalogError::MissingManifest {
                id: self.dataset_id.clone(),
            })
    }

    async fn ingest_manifest(&self, part: &StagedPart) -> Result<Dataset> {
        let bytes = tokio::fs::read(&part.temp)
            .await
            .map_err(|e| CatalogError::ManifestParse {
                message: e.to_string(),
            })?;
        let result = self.catalog.ingest(&bytes, &self.dataset_id).await;
        if let Err(e) = &result {
            warn!("Manifest for dataset {} rejected: {}", self.dataset_id, e);
        }
        result
    }

    async fn should_discard(&self) -> bool {
        if let UploadState::Deciding {
            manifest_error: Some(_),
        } = self.state
        {
            return true;
        }
        !self.catalog.store().contains(&self.dataset_id).await
    }

    fn discard(&mut self, part: StagedPart) -> Result<Disposition> {
        self.discarded += 1;
        let path = part.temp.to_path_buf();
        part.temp
            .close()
            .map_err(|e| CatalogError::io_with_path(e, path))?;
        Ok(Disposition::Discarded)
    }

    async fn commit(&mut self, part: StagedPart) -> Result<Disposition> {
        let Some(file_name) = part.file_name.as_deref().and_then(file_name_for_upload) else {
            warn!(
                "Discarding part '{}' for dataset {}: no usable file name",
                part.field_name, self.dataset_id
            );
            return self.discard(part);
        };

        let dir = dataset_dir(self.catalog.storage_root(), &self.dataset_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CatalogError::io_with_path(e, &dir))?;

        let dest = dir.join(&file_name);
        part.temp
            .persist(&dest)
            .map_err(|e| CatalogError::io_with_path(e.error, &dest))?;

        self.committed += 1;
        debug!("Committed {} for dataset {}", dest.display(), self.dataset_id);
        Ok(Disposition::Committed(dest))
    }
}
