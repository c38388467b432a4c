//! Datashelf Core - dataset catalog backed by flat files.
//!
//! This crate holds everything the HTTP server delegates to: the JSON-backed
//! dataset store, file resolution, manifest ingestion and the per-request
//! upload state machine. It has no HTTP dependency and can be driven
//! directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use datashelf_core::{DatasetCatalog, PublisherConfig};
//!
//! #[tokio::main]
//! async fn main() -> datashelf_core::Result<()> {
//!     let publisher = PublisherConfig::load("datashelf.config".as_ref())?;
//!     let catalog = DatasetCatalog::open("datasets", publisher)?;
//!
//!     let record = catalog.ingest(br#"{"uuid": "abc-123", "name": "n", "version": "1.0.0"}"#, "abc-123").await?;
//!     println!("Published {}", record.urn_component("urn"));
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod persist;
pub mod resolve;
pub mod store;
pub mod upload;

pub use catalog::DatasetCatalog;
pub use config::{AppConfig, PathsConfig, PublisherConfig, UploadConfig};
pub use error::{CatalogError, Result};
pub use models::Dataset;
pub use persist::to_pretty_json;
pub use store::DatasetStore;
pub use upload::{Disposition, StagedPart, UploadPhase, UploadSession};
pub use tempfile::TempPath;
