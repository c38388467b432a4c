//! Integration tests for the DatasetCatalog public interface.
//!
//! These drive a full publish through the upload session and then read the
//! result back the way the HTTP layer does.

use datashelf_core::{
    CatalogError, DatasetCatalog, Disposition, PublisherConfig, StagedPart, UploadPhase,
};
use serde_json::json;
use tempfile::TempDir;

/// Create a data directory with an empty index file.
fn create_test_env() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(temp_dir.path().join("datasets.json"), "[]").unwrap();
    temp_dir
}

fn publisher() -> PublisherConfig {
    PublisherConfig {
        cloud_name: "lab-cloud".to_string(),
        creator_uuid: "0b0e4b9c-creator".to_string(),
        creator_name: "lab".to_string(),
    }
}

fn staged(catalog: &DatasetCatalog, field: &str, file_name: &str, body: &[u8]) -> StagedPart {
    let temp = catalog.stage_file().unwrap();
    std::fs::write(&temp, body).unwrap();
    StagedPart {
        field_name: field.to_string(),
        file_name: Some(file_name.to_string()),
        temp,
    }
}

#[tokio::test]
async fn test_publish_then_read_back() {
    let temp_dir = create_test_env();
    let catalog = DatasetCatalog::open(temp_dir.path(), publisher()).unwrap();

    let mut session = catalog.begin_upload("abc-123").unwrap();
    let manifest = br#"{"uuid":"abc-123","name":"n","version":"1.0.0","files":[{"path":"f.txt"}]}"#;
    session
        .accept(staged(&catalog, "manifest", "manifest.json", manifest))
        .await
        .unwrap();
    assert_eq!(session.phase(), UploadPhase::Deciding);
    let disposition = session
        .accept(staged(&catalog, "f.txt", "f.txt", b"hello world"))
        .await
        .unwrap();
    assert!(matches!(disposition, Disposition::Committed(_)));

    let record = session.finish(Ok(())).await.unwrap();
    assert_eq!(record.get("urn"), Some(&json!("lab-cloud:lab:n:1.0.0")));
    assert_eq!(record.get("creator_uuid"), Some(&json!("0b0e4b9c-creator")));

    let path = catalog.resolve_file("abc-123", "f.txt").await.unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"hello world");

    let listed = catalog.list(&[]).await;
    assert_eq!(listed, vec![record]);
}

#[tokio::test]
async fn test_store_survives_reopen() {
    let temp_dir = create_test_env();
    {
        let catalog = DatasetCatalog::open(temp_dir.path(), publisher()).unwrap();
        catalog
            .ingest(br#"{"uuid":"a","name":"n","version":"1","extra":{"k":[1,2]}}"#, "a")
            .await
            .unwrap();
    }

    let reopened = DatasetCatalog::open(temp_dir.path(), publisher()).unwrap();
    let record = reopened.get("a").await.unwrap();
    assert_eq!(record.get("extra"), Some(&json!({"k": [1, 2]})));

    let on_disk = std::fs::read(reopened.store().path()).unwrap();
    let expected = datashelf_core::to_pretty_json(&reopened.list(&[]).await).unwrap();
    assert_eq!(on_disk, expected);
}

#[tokio::test]
async fn test_unlisted_and_missing_files_are_distinct() {
    let temp_dir = create_test_env();
    let catalog = DatasetCatalog::open(temp_dir.path(), publisher()).unwrap();
    catalog
        .ingest(br#"{"uuid":"a","files":[{"path":"listed.bin"}]}"#, "a")
        .await
        .unwrap();

    let unlisted = catalog.resolve_file("a", "other.bin").await.unwrap_err();
    let missing = catalog.resolve_file("a", "listed.bin").await.unwrap_err();
    assert!(matches!(unlisted, CatalogError::FileNotListed { .. }));
    assert!(matches!(missing, CatalogError::FileMissing { .. }));
    assert_ne!(unlisted.to_string(), missing.to_string());
}
