//! Host scene-graph capabilities
//!
//! The exporter and importer never touch an engine directly. They work
//! through three capability traits that a host implements:
//!
//! - [`SceneProvider`] - node lifetime, hierarchy, transforms, bookkeeping
//! - [`RenderCapability`] - meshes, primitives, materials, skybox
//! - [`PhysicsCapability`] - rigid bodies and colliders
//!
//! [`SceneHost`] is implemented for any type that provides all three.

use std::fmt;
use std::hash::Hash;

use glam::{EulerRot, Mat4, Quat, Vec3};
use space_asset::{ModelNode, SkyboxImage};
use space_document::{ColliderSpec, PortalLinkSpec, PrimitiveKind, RigidBodySpec};

use crate::error::Result;

/// Folder that material names are looked up in
pub const MATERIALS_FOLDER: &str = "Materials";

/// Name of the material applied when none of a node's materials resolve
pub const DEFAULT_MATERIAL_NAME: &str = "RuntimeDefaultMaterial";

/// Color of the fallback material
pub const DEFAULT_MATERIAL_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Local transform; rotation kept as Euler degrees so documents round-trip exactly
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in degrees, applied Z then X then Y
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn rotation_quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation.y.to_radians(),
            self.rotation.x.to_radians(),
            self.rotation.z.to_radians(),
        )
    }

    /// Local-to-parent matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Per-node export and ownership flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// Skip this node and its subtree when exporting
    pub no_export: bool,
    /// Subtree came from an external model and is opaque to the exporter
    pub external_asset_root: bool,
}

/// Per-node overrides that bypass derived asset lookup
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelReference {
    pub override_file_path: Option<String>,
    pub override_remote_url: Option<String>,
}

impl ModelReference {
    pub fn is_empty(&self) -> bool {
        self.override_file_path.is_none() && self.override_remote_url.is_none()
    }
}

/// Node lifetime, hierarchy and bookkeeping
pub trait SceneProvider {
    /// Handle to a live node
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// Create an empty node at the identity transform
    fn create_node(&mut self, name: &str, parent: Option<Self::Node>) -> Self::Node;

    /// Destroy a node and its whole subtree
    fn destroy_node(&mut self, node: Self::Node);

    fn contains(&self, node: Self::Node) -> bool;

    fn name(&self, node: Self::Node) -> Option<String>;

    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Reparent keeping the local transform. Fails on cycles.
    fn set_parent(&mut self, node: Self::Node, parent: Option<Self::Node>) -> Result<()>;

    fn transform(&self, node: Self::Node) -> Option<Transform>;

    fn set_transform(&mut self, node: Self::Node, transform: Transform);

    fn flags(&self, node: Self::Node) -> NodeFlags;

    fn set_flags(&mut self, node: Self::Node, flags: NodeFlags);

    fn model_reference(&self, node: Self::Node) -> Option<ModelReference>;

    fn set_model_reference(&mut self, node: Self::Node, reference: ModelReference);

    fn portal_link(&self, node: Self::Node) -> Option<PortalLinkSpec>;

    fn set_portal_link(&mut self, node: Self::Node, link: PortalLinkSpec);

    /// Script identifiers recorded on the node; never executed
    fn scripts(&self, node: Self::Node) -> Vec<String>;

    fn set_scripts(&mut self, node: Self::Node, scripts: Vec<String>);

    /// Instantiate a decoded model under `parent`. The returned model root
    /// is flagged as an external-asset root.
    fn attach_model(&mut self, parent: Self::Node, model: &ModelNode) -> Self::Node;
}

/// Meshes, materials and environment
pub trait RenderCapability: SceneProvider {
    /// Host material handle
    type Material: Clone;

    /// Name of the mesh rendered by the node
    fn mesh_name(&self, node: Self::Node) -> Option<String>;

    /// Give the node a built-in shape and a renderer. Returns false if the
    /// host has no such primitive.
    fn attach_primitive(&mut self, node: Self::Node, kind: &PrimitiveKind) -> bool;

    fn has_renderer(&self, node: Self::Node) -> bool;

    /// Shared material slot names; `None` for empty slots
    fn material_names(&self, node: Self::Node) -> Vec<Option<String>>;

    /// Look up a material by asset path, e.g. `Materials/Oak`
    fn load_material(&mut self, path: &str) -> Option<Self::Material>;

    /// Gray fallback material named [`DEFAULT_MATERIAL_NAME`]
    fn default_material(&mut self) -> Self::Material;

    fn set_materials(&mut self, node: Self::Node, materials: Vec<Self::Material>);

    fn set_skybox(&mut self, image: SkyboxImage);
}

/// Rigid bodies and colliders
pub trait PhysicsCapability: SceneProvider {
    fn rigid_body(&self, node: Self::Node) -> Option<RigidBodySpec>;

    /// Returns false if the node already has a rigid body
    fn add_rigid_body(&mut self, node: Self::Node, body: RigidBodySpec) -> bool;

    fn collider(&self, node: Self::Node) -> Option<ColliderSpec>;

    /// Returns false if the node already has a collider
    fn add_collider(&mut self, node: Self::Node, collider: ColliderSpec) -> bool;
}

/// Everything the exporter and importer need
pub trait SceneHost: SceneProvider + RenderCapability + PhysicsCapability {}

impl<T: SceneProvider + RenderCapability + PhysicsCapability> SceneHost for T {}

/// Asset path of a named material
pub fn material_path(name: &str) -> String {
    format!("{}/{}", MATERIALS_FOLDER, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matrix() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: Vec3::splat(2.0),
        };

        let point = transform.matrix().transform_point3(Vec3::X);
        // +X rotated 90 degrees about Y points to -Z, then scaled and moved
        assert!((point - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_material_path() {
        assert_eq!(material_path("Oak"), "Materials/Oak");
    }

    #[test]
    fn test_model_reference_empty() {
        assert!(ModelReference::default().is_empty());
        assert!(!ModelReference {
            override_file_path: Some("a.glb".into()),
            override_remote_url: None,
        }
        .is_empty());
    }
}
