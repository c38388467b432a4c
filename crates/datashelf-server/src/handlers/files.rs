//! Dataset file download.

use crate::response::ApiError;
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use datashelf_core::CatalogError;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;

/// `GET /datasets/:id/:path`: stream one file of a dataset.
pub async fn get_dataset_file(
    State(state): State<Arc<AppState>>,
    Path((id, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let file_path = state.catalog.resolve_file(&id, &path).await?;

    // The file can disappear between resolution and open
    let file = File::open(&file_path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => CatalogError::FileMissing {
            id: id.clone(),
            path: path.clone(),
        },
        _ => CatalogError::io_with_path(e, &file_path),
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|e| CatalogError::io_with_path(e, &file_path))?
        .len();

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    info!(dataset = %id, file = %path, size, "Streaming dataset file");
    Ok((StatusCode::OK, headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
