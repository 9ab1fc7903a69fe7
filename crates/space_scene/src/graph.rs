//! In-memory reference host
//!
//! A generational node arena implementing every host capability. Used by
//! the `space` CLI and by tests; engines provide their own implementation.

use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec3};
use space_asset::{ModelNode, SkyboxImage};
use space_document::{ColliderSpec, PortalLinkSpec, PrimitiveKind, RigidBodySpec};

use crate::error::{Result, SceneError};
use crate::host::{
    material_path, ModelReference, NodeFlags, PhysicsCapability, RenderCapability, SceneProvider,
    Transform, DEFAULT_MATERIAL_COLOR, DEFAULT_MATERIAL_NAME,
};

// ============================================================================
// Handles
// ============================================================================

/// Generational node handle: stale handles never alias a reused slot
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

/// Handle into the graph's material library
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(u32);

/// Material known to the graph
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: [f32; 4],
}

/// Mesh rendered by a node
#[derive(Clone, Debug, PartialEq)]
pub struct MeshInfo {
    pub name: String,
    /// Set when the mesh is a built-in shape
    pub primitive: Option<PrimitiveKind>,
}

// ============================================================================
// Node storage
// ============================================================================

#[derive(Clone, Debug)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform: Transform,
    flags: NodeFlags,
    model_reference: Option<ModelReference>,
    portal_link: Option<PortalLinkSpec>,
    scripts: Vec<String>,
    mesh: Option<MeshInfo>,
    renderer: bool,
    materials: Vec<Option<MaterialId>>,
    rigid_body: Option<RigidBodySpec>,
    collider: Option<ColliderSpec>,
}

impl NodeData {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            flags: NodeFlags::default(),
            model_reference: None,
            portal_link: None,
            scripts: Vec::new(),
            mesh: None,
            renderer: false,
            materials: Vec::new(),
            rigid_body: None,
            collider: None,
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// In-memory scene graph
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    materials: Vec<Material>,
    material_paths: HashMap<String, MaterialId>,
    default_material: Option<MaterialId>,
    skybox: Option<SkyboxImage>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a material available at `Materials/<name>`
    pub fn register_material(&mut self, name: &str, color: [f32; 4]) -> MaterialId {
        let id = self.push_material(name, color);
        self.material_paths.insert(material_path(name), id);
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    /// Materials assigned to a node
    pub fn node_materials(&self, node: NodeId) -> Vec<&Material> {
        self.get(node)
            .map(|data| {
                data.materials
                    .iter()
                    .flatten()
                    .filter_map(|id| self.material(*id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Top-level nodes in creation order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.data.is_some()).count()
    }

    pub fn mesh(&self, node: NodeId) -> Option<&MeshInfo> {
        self.get(node).and_then(|d| d.mesh.as_ref())
    }

    pub fn skybox(&self) -> Option<&SkyboxImage> {
        self.skybox.as_ref()
    }

    /// Mark a node as excluded from export
    pub fn set_no_export(&mut self, node: NodeId, no_export: bool) {
        if let Some(data) = self.get_mut(node) {
            data.flags.no_export = no_export;
        }
    }

    /// Give a node a named mesh and a renderer
    pub fn set_mesh(&mut self, node: NodeId, mesh_name: &str) {
        if let Some(data) = self.get_mut(node) {
            data.mesh = Some(MeshInfo {
                name: mesh_name.to_string(),
                primitive: None,
            });
            data.renderer = true;
        }
    }

    /// First node with the given name, depth-first from the roots
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let data = self.get(node)?;
            if data.name == name {
                return Some(node);
            }
            stack.extend(data.children.iter().rev().copied());
        }
        None
    }

    /// Nodes below `node`, depth-first pre-order, `node` excluded
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    /// World matrix: product of local matrices from the top-level ancestor down
    pub fn world_matrix(&self, node: NodeId) -> Option<Mat4> {
        let mut matrix = self.get(node)?.transform.matrix();
        let mut current = self.get(node)?.parent;
        while let Some(parent) = current {
            let data = self.get(parent)?;
            matrix = data.transform.matrix() * matrix;
            current = data.parent;
        }
        Some(matrix)
    }

    pub fn world_position(&self, node: NodeId) -> Option<Vec3> {
        self.world_matrix(node).map(|m| m.transform_point3(Vec3::ZERO))
    }

    /// Indented outline of the subtree, one node per line
    pub fn outline(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.outline_into(node, 0, &mut out);
        out
    }

    fn outline_into(&self, node: NodeId, depth: usize, out: &mut String) {
        let Some(data) = self.get(node) else {
            return;
        };
        let mut tags = Vec::new();
        if data.flags.external_asset_root {
            tags.push("asset".to_string());
        }
        if let Some(mesh) = &data.mesh {
            tags.push(format!("mesh={}", mesh.name));
        }
        if data.collider.is_some() {
            tags.push("collider".to_string());
        }
        if data.rigid_body.is_some() {
            tags.push("rigidbody".to_string());
        }
        if data.portal_link.is_some() {
            tags.push("portal".to_string());
        }

        out.push_str(&"  ".repeat(depth));
        out.push_str(&data.name);
        if !tags.is_empty() {
            out.push_str(&format!(" [{}]", tags.join(", ")));
        }
        out.push('\n');

        for child in &data.children {
            self.outline_into(*child, depth + 1, out);
        }
    }

    fn push_material(&mut self, name: &str, color: [f32; 4]) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Material {
            name: name.to_string(),
            color,
        });
        id
    }

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.slots
            .get(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(node.index as usize)
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    fn allocate(&mut self, data: NodeData) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.get(node).and_then(|d| d.parent);
        match parent {
            Some(parent) => {
                if let Some(data) = self.get_mut(parent) {
                    data.children.retain(|c| *c != node);
                }
            }
            None => self.roots.retain(|r| *r != node),
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.get(n).and_then(|d| d.parent);
        }
        false
    }

    fn instantiate_model(&mut self, parent: NodeId, model: &ModelNode) -> NodeId {
        let node = self.create_node(&model.name, Some(parent));
        if let Some(data) = self.get_mut(node) {
            data.transform = Transform {
                translation: model.translation.into(),
                rotation: model.rotation.into(),
                scale: model.scale.into(),
            };
            if let Some(mesh) = &model.mesh {
                data.mesh = Some(MeshInfo {
                    name: mesh.name.clone(),
                    primitive: None,
                });
                data.renderer = true;
            }
            data.collider = model.collider;
        }
        for child in &model.children {
            self.instantiate_model(node, child);
        }
        node
    }
}

impl SceneProvider for SceneGraph {
    type Node = NodeId;

    fn create_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let parent = parent.filter(|p| self.get(*p).is_some());
        let node = self.allocate(NodeData::new(name, parent));
        match parent.and_then(|p| self.get_mut(p)) {
            Some(parent_data) => parent_data.children.push(node),
            None => self.roots.push(node),
        }
        node
    }

    fn destroy_node(&mut self, node: NodeId) {
        if self.get(node).is_none() {
            return;
        }
        self.detach(node);

        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if let Some(data) = slot.data.take() {
                stack.extend(data.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.get(node).map(|d| d.name.clone())
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|d| d.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|d| d.parent)
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
        if self.get(node).is_none() {
            return Err(SceneError::NodeNotFound(format!("{:?}", node)));
        }
        if let Some(parent) = parent {
            if self.get(parent).is_none() {
                return Err(SceneError::NodeNotFound(format!("{:?}", parent)));
            }
            if self.is_ancestor(node, parent) {
                return Err(SceneError::CycleDetected {
                    child: format!("{:?}", node),
                    parent: format!("{:?}", parent),
                });
            }
        }

        self.detach(node);
        if let Some(data) = self.get_mut(node) {
            data.parent = parent;
        }
        match parent.and_then(|p| self.get_mut(p)) {
            Some(parent_data) => parent_data.children.push(node),
            None => self.roots.push(node),
        }
        Ok(())
    }

    fn transform(&self, node: NodeId) -> Option<Transform> {
        self.get(node).map(|d| d.transform)
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(data) = self.get_mut(node) {
            data.transform = transform;
        }
    }

    fn flags(&self, node: NodeId) -> NodeFlags {
        self.get(node).map(|d| d.flags).unwrap_or_default()
    }

    fn set_flags(&mut self, node: NodeId, flags: NodeFlags) {
        if let Some(data) = self.get_mut(node) {
            data.flags = flags;
        }
    }

    fn model_reference(&self, node: NodeId) -> Option<ModelReference> {
        self.get(node).and_then(|d| d.model_reference.clone())
    }

    fn set_model_reference(&mut self, node: NodeId, reference: ModelReference) {
        if let Some(data) = self.get_mut(node) {
            data.model_reference = Some(reference);
        }
    }

    fn portal_link(&self, node: NodeId) -> Option<PortalLinkSpec> {
        self.get(node).and_then(|d| d.portal_link.clone())
    }

    fn set_portal_link(&mut self, node: NodeId, link: PortalLinkSpec) {
        if let Some(data) = self.get_mut(node) {
            data.portal_link = Some(link);
        }
    }

    fn scripts(&self, node: NodeId) -> Vec<String> {
        self.get(node).map(|d| d.scripts.clone()).unwrap_or_default()
    }

    fn set_scripts(&mut self, node: NodeId, scripts: Vec<String>) {
        if let Some(data) = self.get_mut(node) {
            data.scripts = scripts;
        }
    }

    fn attach_model(&mut self, parent: NodeId, model: &ModelNode) -> NodeId {
        let root = self.instantiate_model(parent, model);
        if let Some(data) = self.get_mut(root) {
            data.flags.external_asset_root = true;
        }
        root
    }
}

impl RenderCapability for SceneGraph {
    type Material = MaterialId;

    fn mesh_name(&self, node: NodeId) -> Option<String> {
        self.mesh(node).map(|m| m.name.clone())
    }

    fn attach_primitive(&mut self, node: NodeId, kind: &PrimitiveKind) -> bool {
        if !kind.is_recognised() {
            return false;
        }
        match self.get_mut(node) {
            Some(data) => {
                data.mesh = Some(MeshInfo {
                    name: kind.as_str().to_string(),
                    primitive: Some(kind.clone()),
                });
                data.renderer = true;
                true
            }
            None => false,
        }
    }

    fn has_renderer(&self, node: NodeId) -> bool {
        self.get(node).map(|d| d.renderer).unwrap_or(false)
    }

    fn material_names(&self, node: NodeId) -> Vec<Option<String>> {
        self.get(node)
            .map(|data| {
                data.materials
                    .iter()
                    .map(|slot| slot.and_then(|id| self.material(id)).map(|m| m.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn load_material(&mut self, path: &str) -> Option<MaterialId> {
        self.material_paths.get(path).copied()
    }

    fn default_material(&mut self) -> MaterialId {
        match self.default_material {
            Some(id) => id,
            None => {
                let id = self.push_material(DEFAULT_MATERIAL_NAME, DEFAULT_MATERIAL_COLOR);
                self.default_material = Some(id);
                id
            }
        }
    }

    fn set_materials(&mut self, node: NodeId, materials: Vec<MaterialId>) {
        if let Some(data) = self.get_mut(node) {
            data.materials = materials.into_iter().map(Some).collect();
        }
    }

    fn set_skybox(&mut self, image: SkyboxImage) {
        self.skybox = Some(image);
    }
}

impl PhysicsCapability for SceneGraph {
    fn rigid_body(&self, node: NodeId) -> Option<RigidBodySpec> {
        self.get(node).and_then(|d| d.rigid_body)
    }

    fn add_rigid_body(&mut self, node: NodeId, body: RigidBodySpec) -> bool {
        match self.get_mut(node) {
            Some(data) if data.rigid_body.is_none() => {
                data.rigid_body = Some(body);
                true
            }
            _ => false,
        }
    }

    fn collider(&self, node: NodeId) -> Option<ColliderSpec> {
        self.get(node).and_then(|d| d.collider)
    }

    fn add_collider(&mut self, node: NodeId, collider: ColliderSpec) -> bool {
        match self.get_mut(node) {
            Some(data) if data.collider.is_none() => {
                data.collider = Some(collider);
                true
            }
            _ => false,
        }
    }
}
