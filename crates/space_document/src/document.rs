//! Scene document schema
//!
//! Field names on the wire follow the documents written by the space
//! editor (`objects`, `parentId`, `WebModelLocation`, ...), so files move
//! freely between the editor and this crate.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::component::ComponentSpec;
use crate::error::{DocumentError, Result};
use crate::metadata::{ContentRating, Language};

// ============================================================================
// Vectors
// ============================================================================

/// Three-component vector, written as `{"x":..,"y":..,"z":..}`
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl From<glam::Vec3> for Vec3 {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for glam::Vec3 {
    fn from(v: Vec3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// ============================================================================
// Node enums
// ============================================================================

/// Where the node's model was expected to come from. Advisory only: the
/// resolver decides from the override fields and document settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ModelSource {
    #[default]
    Resources,
    FileSystem,
    RemoteUrl,
}

impl From<i64> for ModelSource {
    fn from(index: i64) -> Self {
        match index {
            0 => ModelSource::Resources,
            1 => ModelSource::FileSystem,
            2 => ModelSource::RemoteUrl,
            other => {
                log::warn!("ModelSource: unknown ordinal {}, using Resources", other);
                ModelSource::Resources
            }
        }
    }
}

impl From<ModelSource> for i64 {
    fn from(source: ModelSource) -> i64 {
        source as i64
    }
}

/// Built-in shape used when no external asset is available
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Capsule,
    Cylinder,
    Plane,
    Quad,
    /// A spelling this version does not know; kept so it survives re-export
    Unrecognized(String),
}

impl PrimitiveKind {
    /// Every recognised kind, in mesh-name inference order
    pub const RECOGNISED: [PrimitiveKind; 6] = [
        PrimitiveKind::Cube,
        PrimitiveKind::Sphere,
        PrimitiveKind::Capsule,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Plane,
        PrimitiveKind::Quad,
    ];

    /// Parse a wire value. Empty strings mean "no primitive".
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(
            Self::RECOGNISED
                .iter()
                .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
                .cloned()
                .unwrap_or_else(|| PrimitiveKind::Unrecognized(trimmed.to_string())),
        )
    }

    /// Infer a kind from a mesh name: first recognised kind whose lowercase
    /// name is a substring of the lowercased mesh name.
    pub fn infer_from_mesh_name(mesh_name: &str) -> Option<Self> {
        let lowered = mesh_name.to_lowercase();
        Self::RECOGNISED
            .iter()
            .find(|kind| lowered.contains(&kind.as_str().to_lowercase()))
            .cloned()
    }

    pub fn as_str(&self) -> &str {
        match self {
            PrimitiveKind::Cube => "Cube",
            PrimitiveKind::Sphere => "Sphere",
            PrimitiveKind::Capsule => "Capsule",
            PrimitiveKind::Cylinder => "Cylinder",
            PrimitiveKind::Plane => "Plane",
            PrimitiveKind::Quad => "Quad",
            PrimitiveKind::Unrecognized(other) => other,
        }
    }

    pub fn is_recognised(&self) -> bool {
        !matches!(self, PrimitiveKind::Unrecognized(_))
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// One scene entity
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Unique within the document, assigned at export
    #[serde(default)]
    pub id: String,
    /// `None` places the node directly under the document root
    #[serde(default, with = "empty_as_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: Vec3,
    /// Zero means unset and is read back as unit scale
    #[serde(default)]
    pub scale: Vec3,
    #[serde(rename = "primitiveType", default, with = "primitive_field")]
    pub primitive: Option<PrimitiveKind>,
    #[serde(default)]
    pub model_source: ModelSource,
    #[serde(default, with = "empty_as_none")]
    pub override_file_path: Option<String>,
    #[serde(rename = "overrideRemoteURL", default, with = "empty_as_none")]
    pub override_remote_url: Option<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl NodeRecord {
    /// Record with unit scale and nothing attached
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scale: Vec3::ONE,
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_primitive(mut self, primitive: PrimitiveKind) -> Self {
        self.primitive = Some(primitive);
        self
    }

    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.components.push(component);
        self
    }

    /// Scale to apply on import: zero vector means unit scale
    pub fn effective_scale(&self) -> Vec3 {
        if self.scale.is_zero() {
            Vec3::ONE
        } else {
            self.scale
        }
    }
}

/// Document-level settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// Base URL for remote models
    #[serde(rename = "WebModelLocation", default, with = "empty_as_none")]
    pub remote_base_url: Option<String>,
    /// Base directory for local models
    #[serde(rename = "BaseModelPath", default, with = "empty_as_none")]
    pub local_base_dir: Option<String>,
    #[serde(default)]
    pub adult_content: bool,
    #[serde(default)]
    pub content_rating: ContentRating,
    #[serde(default)]
    pub primary_language: Language,
    /// Skybox image, local path or URL
    #[serde(rename = "SkyboxImagePath", default, with = "empty_as_none")]
    pub skybox: Option<String>,
}

/// A portable scene
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Nodes in export traversal order
    #[serde(rename = "objects", default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            nodes: Vec::new(),
            metadata,
        }
    }

    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(DocumentError::Parse)
    }

    /// Parse a document from raw bytes (UTF-8 JSON)
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(DocumentError::Parse)
    }

    /// Read and parse a document file
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(DocumentError::Serialize)
    }

    /// Write the document as pretty JSON
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Records whose parent is `parent_id` (`None` = document root), in order
    pub fn children_of<'a>(&'a self, parent_id: Option<&'a str>) -> impl Iterator<Item = &'a NodeRecord> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id.as_deref() == parent_id)
    }

    /// Check referential integrity without failing.
    ///
    /// The importer tolerates every issue reported here; the list exists for
    /// logging and tooling.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(node.id.clone()));
            }
        }

        for node in &self.nodes {
            match node.parent_id.as_deref() {
                Some(parent) if parent == node.id => {
                    issues.push(ValidationIssue::SelfParent(node.id.clone()));
                }
                Some(parent) if !seen.contains(parent) => {
                    issues.push(ValidationIssue::DanglingParent {
                        node_id: node.id.clone(),
                        parent_id: parent.to_string(),
                    });
                }
                _ => {}
            }
        }
        issues
    }

    /// Map from id to record index; later duplicates win
    pub fn index_by_id(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect()
    }
}

/// Referential problem found by [`Document::validate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    DuplicateId(String),
    DanglingParent { node_id: String, parent_id: String },
    SelfParent(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::DuplicateId(id) => write!(f, "duplicate node id '{}'", id),
            ValidationIssue::DanglingParent { node_id, parent_id } => write!(
                f,
                "node '{}' references missing parent '{}'",
                node_id, parent_id
            ),
            ValidationIssue::SelfParent(id) => write!(f, "node '{}' is its own parent", id),
        }
    }
}

// ============================================================================
// Field encodings
// ============================================================================

/// Optional strings stored as `""` when absent
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.trim().is_empty()))
    }
}

mod primitive_field {
    use super::PrimitiveKind;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<PrimitiveKind>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_ref().map(PrimitiveKind::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PrimitiveKind>, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        Ok(value.as_deref().and_then(PrimitiveKind::parse))
    }
}
