//! Scene exporter
//!
//! Walks a live subtree and produces a [`Document`]. The root itself is
//! never exported; its children become top-level records.

use std::collections::HashMap;

use space_document::{
    canonical_name, ComponentSpec, Document, DocumentMetadata, ModelSource, NodeRecord,
    PrimitiveKind,
};
use uuid::Uuid;

use crate::host::SceneHost;

/// Export everything below `root`, depth-first pre-order.
///
/// Subtrees flagged `no_export` are skipped. External-asset roots are
/// exported as a single record; their descendants are opaque.
pub fn export_scene<H: SceneHost>(host: &H, root: H::Node, metadata: DocumentMetadata) -> Document {
    let mut document = Document::new(metadata);
    let mut ids: HashMap<H::Node, String> = HashMap::new();

    let mut stack: Vec<H::Node> = host.children(root).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        let flags = host.flags(node);
        if flags.no_export {
            continue;
        }

        let id = Uuid::new_v4().to_string();
        let parent_id = host
            .parent(node)
            .filter(|p| *p != root)
            .and_then(|p| ids.get(&p).cloned());
        let record = export_node(host, node, id.clone(), parent_id);
        ids.insert(node, id);
        document.nodes.push(record);

        if !flags.external_asset_root {
            stack.extend(host.children(node).into_iter().rev());
        }
    }

    log::info!(
        "SceneExporter: exported {} nodes from '{}'",
        document.nodes.len(),
        host.name(root).unwrap_or_default()
    );
    document
}

fn export_node<H: SceneHost>(host: &H, node: H::Node, id: String, parent_id: Option<String>) -> NodeRecord {
    let name = host.name(node).unwrap_or_default();
    let mut record = NodeRecord::new(id, canonical_name(&name));
    record.parent_id = parent_id;

    if let Some(transform) = host.transform(node) {
        record.position = transform.translation.into();
        record.rotation = transform.rotation.into();
        record.scale = transform.scale.into();
    }

    record.primitive = host
        .mesh_name(node)
        .and_then(|mesh| PrimitiveKind::infer_from_mesh_name(&mesh));

    if let Some(reference) = host.model_reference(node) {
        record.override_file_path = reference.override_file_path;
        record.override_remote_url = reference.override_remote_url;
    }
    record.model_source = if record.override_remote_url.is_some() {
        ModelSource::RemoteUrl
    } else if record.override_file_path.is_some() {
        ModelSource::FileSystem
    } else {
        ModelSource::Resources
    };

    record.materials = host.material_names(node).into_iter().flatten().collect();

    if let Some(body) = host.rigid_body(node) {
        record.components.push(ComponentSpec::RigidBody(body));
    }
    if let Some(collider) = host.collider(node) {
        record.components.push(ComponentSpec::Collider(collider));
    }
    if let Some(link) = host.portal_link(node) {
        record.components.push(ComponentSpec::PortalLink(link));
    }

    record.scripts = host.scripts(node);
    record
}
