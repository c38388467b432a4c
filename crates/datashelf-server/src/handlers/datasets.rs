//! Dataset metadata handlers.

use crate::response::{ApiError, PrettyJson};
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::debug;

/// `GET /datasets`, optionally filtered by `?field=value` pairs.
pub async fn list_datasets(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let datasets = state.catalog.list(&filters).await;
    debug!("Listing {} datasets ({} filters)", datasets.len(), filters.len());
    PrettyJson(StatusCode::OK, datasets)
}

/// `GET /datasets/:id`
pub async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.catalog.get(&id).await?;
    Ok(PrettyJson(StatusCode::OK, dataset))
}
