//! HTTP request handlers, split by concern.

mod datasets;
mod files;
mod publish;

pub use datasets::{get_dataset, list_datasets};
pub use files::get_dataset_file;
pub use publish::publish_dataset;

use crate::response::{ErrorEnvelope, PrettyJson};
use axum::{http::StatusCode, http::Uri, response::IntoResponse};
use serde_json::json;

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    PrettyJson(StatusCode::OK, json!({"status": "ok"}))
}

/// Fallback for unknown routes, so every error carries the JSON envelope.
pub async fn handle_not_found(uri: Uri) -> impl IntoResponse {
    PrettyJson(
        StatusCode::NOT_FOUND,
        ErrorEnvelope {
            code: StatusCode::NOT_FOUND.as_u16(),
            message: format!("{} does not exist", uri.path()),
        },
    )
}
