//! Error types for scene operations

use space_asset::FetchError;
use space_document::DocumentError;
use thiserror::Error;

/// Scene errors
#[derive(Debug, Error)]
pub enum SceneError {
    /// Node handle is stale or was never created
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Reparenting would make a node its own ancestor
    #[error("Reparenting {child} under {parent} would create a cycle")]
    CycleDetected { child: String, parent: String },

    /// Operation needs a loaded scene
    #[error("No scene is loaded")]
    NoActiveScene,

    /// Document locator is neither an existing file nor an absolute URL
    #[error("Cannot locate scene document {0}")]
    Unlocatable(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
