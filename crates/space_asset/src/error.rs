//! Error types for asset fetching and decoding

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain the bytes of an asset
#[derive(Debug, Error)]
pub enum FetchError {
    /// Local file does not exist
    #[error("Asset not found: {0}")]
    NotFound(PathBuf),

    /// Local file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Request could not be completed
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// No fetcher handles this location
    #[error("Unsupported asset location: {0}")]
    UnsupportedLocation(String),
}

/// Failure to turn fetched bytes into a usable asset
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Model has no scene and no nodes")]
    EmptyScene,

    #[error("Invalid image: {0}")]
    Image(#[from] image::ImageError),
}

/// Any failure during a load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The blocking decode task panicked or was aborted
    #[error("Decoder task failed: {0}")]
    Task(String),

    /// The loader's concurrency gate was closed
    #[error("Loader is shut down")]
    Closed,

    /// The load future was dropped before finishing
    #[error("Load cancelled")]
    Cancelled,

    /// The locator is neither an existing file nor an absolute URL
    #[error("Cannot locate {0}")]
    Unlocatable(String),
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;
