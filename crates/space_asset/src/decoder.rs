//! Model decoding
//!
//! Decoders turn fetched bytes into a [`ModelNode`] tree: names, local
//! transforms and mesh/material references. Geometry stays with the host
//! renderer; this crate never uploads anything.

use std::collections::HashSet;

use glam::{EulerRot, Quat};
use space_document::{ColliderSpec, Vec3};

use crate::error::DecodeError;
use crate::location::AssetLocation;

/// Mesh reference carried by a model node
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMesh {
    pub name: String,
    pub primitive_count: usize,
    /// Material name per primitive that has one
    pub material_names: Vec<String>,
}

/// One node of a decoded model
#[derive(Clone, Debug, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub translation: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    pub scale: Vec3,
    pub mesh: Option<ModelMesh>,
    pub collider: Option<ColliderSpec>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    /// Node at the origin with unit scale
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            mesh: None,
            collider: None,
            children: Vec::new(),
        }
    }

    /// Nodes in this subtree, self included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ModelNode::node_count).sum::<usize>()
    }

    /// Depth-first walk, parents before children
    pub fn walk(&self, visit: &mut impl FnMut(&ModelNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut ModelNode)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }
}

/// Turns raw model bytes into a node tree
pub trait ModelDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], location: &AssetLocation) -> Result<ModelNode, DecodeError>;
}

/// glTF 2.0 decoder for both `.gltf` (JSON) and `.glb` (binary)
///
/// Reads the document structure only, so external buffers and images are
/// never touched.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfDecoder;

impl ModelDecoder for GltfDecoder {
    fn decode(&self, bytes: &[u8], location: &AssetLocation) -> Result<ModelNode, DecodeError> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let document = &gltf.document;

        let roots: Vec<gltf::Node> = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().collect(),
            None => {
                // No scene: every node that is nobody's child is a root
                let children: HashSet<usize> = document
                    .nodes()
                    .flat_map(|n| n.children().map(|c| c.index()).collect::<Vec<_>>())
                    .collect();
                document.nodes().filter(|n| !children.contains(&n.index())).collect()
            }
        };

        if roots.is_empty() {
            return Err(DecodeError::EmptyScene);
        }

        let mut root = ModelNode::new(location.file_stem());
        let mut visited = HashSet::new();
        for node in roots {
            if let Some(child) = convert_node(&node, &mut visited) {
                root.children.push(child);
            }
        }

        log::debug!(
            "GltfDecoder: {} decoded with {} nodes, {} meshes",
            location,
            root.node_count() - 1,
            document.meshes().count()
        );

        Ok(root)
    }
}

fn convert_node(node: &gltf::Node, visited: &mut HashSet<usize>) -> Option<ModelNode> {
    if !visited.insert(node.index()) {
        log::warn!("GltfDecoder: node {} is referenced twice, skipping", node.index());
        return None;
    }

    let (translation, rotation, scale) = node.transform().decomposed();
    let (yaw, pitch, roll) = Quat::from_array(rotation).to_euler(EulerRot::YXZ);

    let mesh = node.mesh().map(|mesh| {
        let primitives: Vec<gltf::Primitive> = mesh.primitives().collect();
        ModelMesh {
            name: mesh.name().unwrap_or("").to_string(),
            primitive_count: primitives.len(),
            material_names: primitives
                .iter()
                .filter_map(|p| p.material().name().map(str::to_string))
                .collect(),
        }
    });

    let name = node
        .name()
        .map(str::to_string)
        .or_else(|| mesh.as_ref().map(|m| m.name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| format!("Node{}", node.index()));

    Some(ModelNode {
        name,
        translation: Vec3::new(translation[0], translation[1], translation[2]),
        rotation: Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees()),
        scale: Vec3::new(scale[0], scale[1], scale[2]),
        mesh,
        collider: None,
        children: node
            .children()
            .filter_map(|child| convert_node(&child, visited))
            .collect(),
    })
}
