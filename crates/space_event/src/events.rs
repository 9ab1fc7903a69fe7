//! Lifecycle event payloads

use chrono::{DateTime, Utc};
use glam::{Quat, Vec3};

// ============================================================================
// Scene documents
// ============================================================================

/// A scene document started loading
#[derive(Clone, Debug, PartialEq)]
pub struct SceneLoadStarted {
    pub path_or_url: String,
}

/// A scene document was imported
#[derive(Clone, Debug, PartialEq)]
pub struct SceneLoadCompleted {
    pub path_or_url: String,
    pub scene_name: String,
    pub node_count: usize,
}

/// A scene document could not be read or parsed
#[derive(Clone, Debug, PartialEq)]
pub struct SceneLoadFailed {
    pub path_or_url: String,
    pub error: String,
}

// ============================================================================
// External assets
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct AssetLoadStarted {
    /// Caller-chosen identifier, usually the document node id
    pub asset_id: String,
    pub path_or_url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetLoadCompleted {
    pub asset_id: String,
    pub path_or_url: String,
    /// Name given to the asset root (the source file stem)
    pub root_name: String,
    /// Nodes in the decoded subtree, root included
    pub node_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetLoadFailed {
    pub asset_id: String,
    pub path_or_url: String,
    pub error: String,
}

// ============================================================================
// Skybox
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SkyboxLoadStarted {
    pub path_or_url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkyboxLoadCompleted {
    pub path_or_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkyboxLoadFailed {
    pub path_or_url: String,
    pub error: String,
}

// ============================================================================
// Portals
// ============================================================================

/// A player entered a portal that links to another scene document
#[derive(Clone, Debug, PartialEq)]
pub struct PortalTransit {
    pub destination_url: String,
    /// Name of the portal node, if known
    pub portal_id: Option<String>,
    pub entry_position: Vec3,
    pub entry_rotation: Quat,
    pub player_id: Option<String>,
    /// Component or script that triggered the transit
    pub triggered_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PortalTransit {
    /// Transit stamped with the current time and no optional context
    pub fn new(destination_url: impl Into<String>, entry_position: Vec3, entry_rotation: Quat) -> Self {
        Self {
            destination_url: destination_url.into(),
            portal_id: None,
            entry_position,
            entry_rotation,
            player_id: None,
            triggered_by: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_portal(mut self, portal_id: impl Into<String>) -> Self {
        self.portal_id = Some(portal_id.into());
        self
    }

    pub fn with_player(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = Some(player_id.into());
        self
    }

    pub fn triggered_by(mut self, source: impl Into<String>) -> Self {
        self.triggered_by = Some(source.into());
        self
    }
}
