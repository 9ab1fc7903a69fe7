//! Error types for scene documents

use std::path::PathBuf;
use thiserror::Error;

/// Document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document file could not be read
    #[error("Failed to read scene document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the schema
    #[error("Malformed scene document: {0}")]
    Parse(#[source] serde_json::Error),

    /// The document could not be written
    #[error("Failed to serialize scene document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;
