//! Manifest ingestion: parse, validate against the target uuid, stamp the
//! server-controlled fields and commit to the store.

use crate::config::PublisherConfig;
use crate::error::{CatalogError, Result};
use crate::models::{
    Dataset, FIELD_CLOUD_NAME, FIELD_CREATOR_NAME, FIELD_CREATOR_UUID, FIELD_NAME,
    FIELD_PUBLISHED_AT, FIELD_URN, FIELD_UUID, FIELD_VERSION,
};
use crate::store::DatasetStore;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

/// Parse a manifest document into a dataset record.
pub fn parse_manifest(bytes: &[u8]) -> Result<Dataset> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| CatalogError::ManifestParse {
            message: e.to_string(),
        })?;
    Dataset::from_value(value).ok_or_else(|| CatalogError::ManifestParse {
        message: "manifest must be a JSON object".to_string(),
    })
}

/// Overwrite the publisher fields and derive `urn` and `published_at`.
pub fn stamp(manifest: &mut Dataset, publisher: &PublisherConfig, now: DateTime<Utc>) {
    manifest.set(FIELD_CLOUD_NAME, publisher.cloud_name.as_str());
    manifest.set(FIELD_CREATOR_UUID, publisher.creator_uuid.as_str());
    manifest.set(FIELD_CREATOR_NAME, publisher.creator_name.as_str());

    let urn = format!(
        "{}:{}:{}:{}",
        publisher.cloud_name,
        publisher.creator_name,
        manifest.urn_component(FIELD_NAME),
        manifest.urn_component(FIELD_VERSION),
    );
    manifest.set(FIELD_URN, urn);
    manifest.set(
        FIELD_PUBLISHED_AT,
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
}

/// Ingest a manifest for `expected_uuid` and return the committed record.
///
/// On any error the store is left unchanged.
pub async fn ingest(
    store: &DatasetStore,
    publisher: &PublisherConfig,
    manifest: &[u8],
    expected_uuid: &str,
) -> Result<Dataset> {
    let mut record = parse_manifest(manifest)?;

    if record.uuid() != Some(expected_uuid) {
        return Err(CatalogError::ManifestMismatch {
            expected: expected_uuid.to_string(),
            actual: record.urn_component(FIELD_UUID),
        });
    }

    stamp(&mut record, publisher, Utc::now());
    let committed = store.upsert(record).await?;
    info!(
        "Published dataset {} as {}",
        expected_uuid,
        committed.urn_component(FIELD_URN)
    );
    Ok(committed)
}
