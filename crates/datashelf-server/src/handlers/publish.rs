//! `PUT /datasets/:id`: publish a dataset version from a multipart upload.

use crate::response::{ApiError, PrettyJson};
use crate::server::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use datashelf_core::{CatalogError, StagedPart, UploadConfig, UploadSession};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Outcome of reading the multipart stream; `Err` holds the parser failure.
type TransportOutcome = std::result::Result<(), String>;

pub async fn publish_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let catalog = &state.catalog;
    let mut session = match catalog.begin_upload(&id) {
        Ok(session) => session,
        Err(e) => return ApiError(e).into_response(),
    };

    let transport = match multipart {
        Ok(mut multipart) => match receive_parts(&state, &mut session, &mut multipart).await {
            Ok(outcome) => outcome,
            Err(e) => return ApiError(e).into_response(),
        },
        Err(rejection) => Err(rejection.body_text()),
    };

    match session.finish(transport).await {
        Ok(dataset) => {
            info!("Dataset {} published", id);
            PrettyJson(StatusCode::OK, dataset).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Stage every part and hand it to the session as it arrives.
///
/// The outer `Err` is a server-side failure that aborts the request; the
/// inner outcome is the multipart parser's verdict.
async fn receive_parts(
    state: &AppState,
    session: &mut UploadSession<'_>,
    multipart: &mut Multipart,
) -> datashelf_core::Result<TransportOutcome> {
    let catalog = &state.catalog;
    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(Ok(())),
            Err(e) => return Ok(Err(transport_message(&e, state.max_upload_bytes))),
        };

        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        if file_name.is_none() && field_name != UploadConfig::MANIFEST_FIELD {
            debug!("Ignoring non-file form field '{}'", field_name);
            continue;
        }

        let temp = catalog.stage_file()?;
        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| CatalogError::io_with_path(e, temp.to_path_buf()))?;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => file
                    .write_all(&chunk)
                    .await
                    .map_err(|e| CatalogError::io_with_path(e, temp.to_path_buf()))?,
                Ok(None) => break,
                Err(e) => return Ok(Err(transport_message(&e, state.max_upload_bytes))),
            }
        }
        file.flush()
            .await
            .map_err(|e| CatalogError::io_with_path(e, temp.to_path_buf()))?;
        drop(file);

        session
            .accept(StagedPart {
                field_name,
                file_name,
                temp,
            })
            .await?;
    }
}

/// Describe a multipart failure, naming the body limit when it was hit.
fn transport_message(err: &MultipartError, max_upload_bytes: usize) -> String {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        format!(
            "request body exceeds the upload limit of {} bytes",
            max_upload_bytes
        )
    } else {
        err.body_text()
    }
}
