//! Error types for the dataset catalog.
//!
//! Every failure a client can observe maps to one variant here, and each
//! variant knows the HTTP status it is reported with.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    // Lookup errors
    #[error("Dataset '{id}' not found")]
    DatasetNotFound { id: String },

    #[error("Dataset '{id}' does not have a '{path}' file")]
    FileNotListed { id: String, path: String },

    #[error("File '{path}' of dataset '{id}' not found on server")]
    FileMissing { id: String, path: String },

    #[error("Invalid file path: '{path}'")]
    InvalidFilePath { path: String },

    // Publishing errors
    #[error("Error parsing manifest file ({message})")]
    ManifestParse { message: String },

    #[error("UUID param, '{expected}', does not match the UUID in the uploaded manifest, '{actual}'")]
    ManifestMismatch { expected: String, actual: String },

    #[error("Missing manifest for dataset '{id}'")]
    MissingManifest { id: String },

    #[error("Failed to persist datasets to {path:?}: {message}")]
    Persist {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<Box<CatalogError>>,
    },

    #[error("Error parsing form ({message})")]
    Transport { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CatalogError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CatalogError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// HTTP status code this error is reported with.
    ///
    /// - 404: the dataset or one of its files cannot be found
    /// - 400: the client sent something malformed or inconsistent
    /// - 500: transport, persistence or other server-side I/O failures
    pub fn http_status(&self) -> u16 {
        match self {
            CatalogError::DatasetNotFound { .. }
            | CatalogError::FileNotListed { .. }
            | CatalogError::FileMissing { .. } => 404,

            CatalogError::InvalidFilePath { .. }
            | CatalogError::ManifestParse { .. }
            | CatalogError::ManifestMismatch { .. }
            | CatalogError::MissingManifest { .. } => 400,

            CatalogError::Persist { .. }
            | CatalogError::Transport { .. }
            | CatalogError::Io { .. }
            | CatalogError::Json { .. }
            | CatalogError::Config { .. } => 500,
        }
    }

    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}
