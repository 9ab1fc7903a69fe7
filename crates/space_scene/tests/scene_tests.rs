//! Integration tests for space_scene
//!
//! Import/export cycles over the in-memory SceneGraph, replace policies and
//! session events

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::Mutex;
use space_asset::{AssetLoader, GltfDecoder, LoaderConfig, LocalFetcher, LocalFileSystem};
use space_document::{
    ColliderShape, ColliderSpec, ComponentSpec, Document, DocumentMetadata, NodeRecord,
    PortalLinkSpec, PrimitiveKind, RawComponent, RigidBodySpec,
};
use space_event::{EventBus, PortalTransit, SceneLoadCompleted, SceneLoadFailed, SceneLoadStarted};
use space_scene::prelude::*;
use space_scene::{NodeId, DEFAULT_MATERIAL_NAME};

const CRATE_GLTF: &str = r#"{
    "asset": {"version": "2.0"},
    "scenes": [{"nodes": [0]}],
    "nodes": [{"name": "Lid", "mesh": 0, "children": [1]}, {"name": "Handle"}],
    "meshes": [{"name": "LidMesh", "primitives": [{"attributes": {"POSITION": 0}}]}],
    "accessors": [{
        "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
        "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
    }],
    "bufferViews": [{"buffer": 0, "byteLength": 36}],
    "buffers": [{"byteLength": 36, "uri": "crate.bin"}]
}"#;

fn session_with(events: Arc<EventBus>, config: ImportConfig) -> Session<SceneGraph> {
    let loader = AssetLoader::with_parts(
        LoaderConfig::default(),
        events,
        Arc::new(LocalFetcher),
        Arc::new(GltfDecoder),
        Arc::new(LocalFileSystem),
    );
    Session::new(SceneGraph::new(), loader, config)
}

fn session() -> Session<SceneGraph> {
    session_with(Arc::new(EventBus::new()), ImportConfig::default())
}

fn document(nodes: Vec<NodeRecord>) -> Document {
    let mut doc = Document::new(DocumentMetadata {
        name: "Test Space".into(),
        ..Default::default()
    });
    doc.nodes = nodes;
    doc
}

/// (child, parent) name pairs below the session root; top-level nodes pair with ""
fn edges(session: &Session<SceneGraph>) -> BTreeSet<(String, String)> {
    let graph = session.host();
    let root = session.root().unwrap();
    graph
        .descendants(root)
        .into_iter()
        .filter(|n| graph.parent(*n).map_or(true, |p| !graph.flags(p).external_asset_root))
        .map(|n| {
            let parent = graph.parent(n).filter(|p| *p != root);
            (
                graph.name(n).unwrap(),
                parent.and_then(|p| graph.name(p)).unwrap_or_default(),
            )
        })
        .collect()
}

fn node(session: &Session<SceneGraph>, name: &str) -> NodeId {
    session.host().find_by_name(name).unwrap()
}

#[tokio::test]
async fn test_round_trip_preserves_structure() {
    let doc = document(vec![
        NodeRecord::new("a", "Hall").with_primitive(PrimitiveKind::Plane),
        NodeRecord::new("b", "Pillar").with_parent("a").with_primitive(PrimitiveKind::Cylinder),
        NodeRecord::new("c", "Lamp").with_parent("b").with_primitive(PrimitiveKind::Sphere),
        NodeRecord::new("d", "Rug").with_primitive(PrimitiveKind::Quad),
    ]);

    let mut first = session();
    first.import(doc).await;
    let exported = first.export().unwrap();

    assert_eq!(exported.nodes.len(), 4);
    let ids: BTreeSet<&str> = exported.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(exported.metadata.name, "Test Space");

    let mut second = session();
    second.import(exported).await;

    assert_eq!(edges(&first), edges(&second));
    assert!(edges(&second).contains(&("Lamp".to_string(), "Pillar".to_string())));
    assert!(edges(&second).contains(&("Rug".to_string(), String::new())));
}

#[tokio::test]
async fn test_relink_independent_of_record_order() {
    let doc = document(vec![
        NodeRecord::new("child", "Child").with_parent("parent"),
        NodeRecord::new("grandchild", "Grandchild").with_parent("child"),
        NodeRecord::new("parent", "Parent"),
    ]);

    let mut session = session();
    session.import(doc).await;

    let graph = session.host();
    assert_eq!(graph.parent(node(&session, "Child")), Some(node(&session, "Parent")));
    assert_eq!(graph.parent(node(&session, "Grandchild")), Some(node(&session, "Child")));
    assert_eq!(graph.parent(node(&session, "Parent")), session.root());
}

#[tokio::test]
async fn test_dangling_parent_stays_under_root() {
    let doc = document(vec![NodeRecord::new("orphan", "Orphan").with_parent("nobody")]);

    let mut session = session();
    let report = session.import(doc).await;

    assert_eq!(report.dangling_parents, vec!["orphan"]);
    assert_eq!(session.host().parent(node(&session, "Orphan")), session.root());
}

#[tokio::test]
async fn test_zero_scale_normalized() {
    let mut flat = NodeRecord::new("a", "Flat");
    flat.scale = space_document::Vec3::ZERO;
    let mut tall = NodeRecord::new("b", "Tall");
    tall.scale = space_document::Vec3::new(1.0, 3.5, 1.0);

    let mut session = session();
    session.import(document(vec![flat, tall])).await;

    let graph = session.host();
    assert_eq!(graph.transform(node(&session, "Flat")).unwrap().scale, Vec3::ONE);
    assert_eq!(
        graph.transform(node(&session, "Tall")).unwrap().scale,
        Vec3::new(1.0, 3.5, 1.0)
    );
}

#[tokio::test]
async fn test_primitive_fallback_and_gaps() {
    let doc = document(vec![
        NodeRecord::new("a", "Ball").with_primitive(PrimitiveKind::Sphere),
        NodeRecord::new("b", "Blob").with_primitive(PrimitiveKind::Unrecognized("Torus".into())),
        NodeRecord::new("c", "Empty"),
    ]);

    let mut session = session();
    let report = session.import(doc).await;

    let graph = session.host();
    let ball = graph.mesh(node(&session, "Ball")).unwrap();
    assert_eq!(ball.primitive, Some(PrimitiveKind::Sphere));
    assert!(graph.mesh(node(&session, "Blob")).is_none());

    assert_eq!(report.primitives, 1);
    assert_eq!(report.gaps, vec!["b", "c"]);
    assert_eq!(report.assets_loaded, 0);
}

#[tokio::test]
async fn test_first_collider_wins() {
    let first = ColliderSpec {
        is_trigger: false,
        shape: ColliderShape::Box {
            center: space_document::Vec3::ZERO,
            size: space_document::Vec3::new(1.0, 2.0, 1.0),
        },
    };
    let second = ColliderSpec {
        is_trigger: true,
        shape: ColliderShape::Sphere {
            center: space_document::Vec3::ZERO,
            radius: 4.0,
        },
    };
    let record = NodeRecord::new("a", "Crate")
        .with_primitive(PrimitiveKind::Cube)
        .with_component(ComponentSpec::Collider(first))
        .with_component(ComponentSpec::Collider(second))
        .with_component(ComponentSpec::RigidBody(RigidBodySpec {
            mass: 2.0,
            use_gravity: true,
            ..Default::default()
        }));

    let mut session = session();
    session.import(document(vec![record])).await;

    let graph = session.host();
    let crate_node = node(&session, "Crate");
    assert_eq!(graph.collider(crate_node), Some(first));
    assert_eq!(graph.rigid_body(crate_node).map(|b| b.mass), Some(2.0));
}

#[tokio::test]
async fn test_unknown_components_reported() {
    let record = NodeRecord::new("a", "Speaker")
        .with_component(ComponentSpec::Unknown(RawComponent::new("AudioSource").with("volume", "0.5")));

    let mut session = session();
    let report = session.import(document(vec![record])).await;

    assert_eq!(report.skipped_components, vec!["AudioSource"]);
}

#[tokio::test]
async fn test_materials_and_fallback() {
    let mut table = NodeRecord::new("a", "Table").with_primitive(PrimitiveKind::Cube);
    table.materials = vec!["Oak".into(), "Missing".into()];
    let mut stone = NodeRecord::new("b", "Stone").with_primitive(PrimitiveKind::Sphere);
    stone.materials = vec!["Granite".into()];

    let mut session = session();
    session.host_mut().register_material("Oak", [0.6, 0.4, 0.2, 1.0]);
    session.import(document(vec![table, stone])).await;

    let graph = session.host();
    assert_eq!(graph.material_names(node(&session, "Table")), vec![Some("Oak".to_string())]);
    assert_eq!(
        graph.material_names(node(&session, "Stone")),
        vec![Some(DEFAULT_MATERIAL_NAME.to_string())]
    );
}

fn write_crate_model(dir: &Path) {
    std::fs::write(dir.join("Crate.gltf"), CRATE_GLTF).unwrap();
}

#[tokio::test]
async fn test_local_asset_attached_and_opaque_on_export() {
    let dir = tempfile::tempdir().unwrap();
    write_crate_model(dir.path());

    let mut doc = document(vec![
        NodeRecord::new("a", "Crate (2)").with_primitive(PrimitiveKind::Cube),
        NodeRecord::new("b", "Floor").with_primitive(PrimitiveKind::Plane),
    ]);
    doc.metadata.local_base_dir = Some(dir.path().to_string_lossy().into_owned());

    let mut session = session();
    let report = session.import(doc).await;

    assert_eq!(report.assets_loaded, 1);
    assert_eq!(report.primitives, 1);

    let graph = session.host();
    let placeholder = node(&session, "Crate (2)");
    assert!(graph.flags(placeholder).external_asset_root);
    assert!(graph.mesh(placeholder).is_none(), "asset replaces the primitive");

    let model_root = graph.children(placeholder)[0];
    assert_eq!(graph.name(model_root).as_deref(), Some("Crate"));
    let lid = node(&session, "Lid");
    assert_eq!(graph.mesh_name(lid).as_deref(), Some("LidMesh"));
    assert!(graph.collider(lid).is_some(), "mesh nodes get default colliders");

    let exported = session.export().unwrap();
    let names: Vec<&str> = exported.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Crate", "Floor"]);

    // Second cycle keeps the same record count
    let mut again = session_with(Arc::new(EventBus::new()), ImportConfig::default());
    let mut exported = exported;
    exported.metadata.local_base_dir = Some(dir.path().to_string_lossy().into_owned());
    again.import(exported).await;
    assert_eq!(again.export().unwrap().nodes.len(), 2);
}

#[tokio::test]
async fn test_failed_asset_falls_back_to_primitive() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Barrel.glb"), b"not a model").unwrap();

    let mut doc = document(vec![NodeRecord::new("a", "Barrel").with_primitive(PrimitiveKind::Cylinder)]);
    doc.metadata.local_base_dir = Some(dir.path().to_string_lossy().into_owned());

    let mut session = session();
    let report = session.import(doc).await;

    assert_eq!(report.asset_failures, 1);
    assert_eq!(report.primitives, 1);
    let barrel = node(&session, "Barrel");
    assert_eq!(session.host().mesh_name(barrel).as_deref(), Some("Cylinder"));
}

#[tokio::test]
async fn test_overrides_and_scripts_survive_export() {
    let mut record = NodeRecord::new("a", "Door").with_component(ComponentSpec::PortalLink(PortalLinkSpec {
        destination_url: "https://spaces.example.com/garden.json".into(),
    }));
    record.override_remote_url = Some("https://cdn.example.com/door.gltf#unreachable".into());
    record.scripts = vec!["OpenOnTouch".into(), "Glow".into()];

    let config = ImportConfig::default().with_allowed_script("OpenOnTouch");
    let mut session = session_with(Arc::new(EventBus::new()), config);
    let report = session.import(document(vec![record])).await;

    let allowed: Vec<bool> = report.scripts.iter().map(|s| s.allowed).collect();
    assert_eq!(allowed, vec![true, false]);

    let exported = session.export().unwrap();
    let door = &exported.nodes[0];
    assert_eq!(door.scripts, vec!["OpenOnTouch", "Glow"]);
    assert_eq!(door.model_source, space_document::ModelSource::RemoteUrl);
    assert!(door.override_remote_url.is_some());
    assert!(door.components.iter().any(|c| c.type_name() == "PortalLink"));
}

#[tokio::test]
async fn test_swap_on_success_keeps_scene_after_bad_document() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    document(vec![NodeRecord::new("a", "Statue")]).write_to(&good).unwrap();
    std::fs::write(&bad, "{ \"objects\": [ oops").unwrap();

    let events = Arc::new(EventBus::new());
    let failures = Arc::new(Mutex::new(Vec::new()));
    let f = failures.clone();
    events.subscribe(move |e: &SceneLoadFailed| f.lock().push(e.path_or_url.clone()));

    let mut session = session_with(events, ImportConfig::default());
    session.load(good.to_str().unwrap()).await.unwrap();
    let root = session.root().unwrap();

    let result = session.load(bad.to_str().unwrap()).await;

    assert!(matches!(result, Err(SceneError::Document(_))));
    assert_eq!(session.root(), Some(root));
    assert!(session.host().contains(root));
    assert!(session.host().find_by_name("Statue").is_some());
    assert_eq!(failures.lock().len(), 1);
}

#[tokio::test]
async fn test_discard_first_clears_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    document(vec![NodeRecord::new("a", "Statue")]).write_to(&good).unwrap();

    let config = ImportConfig::default().with_replace_policy(ReplacePolicy::DiscardFirst);
    let mut session = session_with(Arc::new(EventBus::new()), config);
    session.load(good.to_str().unwrap()).await.unwrap();

    let missing = dir.path().join("missing.json");
    let result = session.load(missing.to_str().unwrap()).await;

    assert!(matches!(result, Err(SceneError::Unlocatable(_))));
    assert_eq!(session.root(), None);
    assert_eq!(session.host().node_count(), 0);
}

#[tokio::test]
async fn test_reload_replaces_previous_root() {
    let mut session = session();
    session.import(document(vec![NodeRecord::new("a", "Old")])).await;
    let old_root = session.root().unwrap();

    session.import(document(vec![NodeRecord::new("b", "New")])).await;

    assert!(!session.host().contains(old_root));
    assert!(session.host().find_by_name("Old").is_none());
    assert!(session.host().find_by_name("New").is_some());
    assert_eq!(session.host().roots().len(), 1);
}

#[tokio::test]
async fn test_scene_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("space.json");
    document(vec![NodeRecord::new("a", "One"), NodeRecord::new("b", "Two")])
        .write_to(&path)
        .unwrap();

    let events = Arc::new(EventBus::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    events.subscribe(move |_: &SceneLoadStarted| l.lock().push("started".to_string()));
    let l = log.clone();
    events.subscribe(move |e: &SceneLoadCompleted| {
        l.lock().push(format!("completed:{}:{}", e.scene_name, e.node_count))
    });

    let mut session = session_with(events, ImportConfig::default());
    session.load(path.to_str().unwrap()).await.unwrap();

    assert_eq!(*log.lock(), vec!["started", "completed:Test Space:2"]);
    assert_eq!(session.source(), path.to_str());
}

#[tokio::test]
async fn test_in_memory_import_pairs_events() {
    let events = Arc::new(EventBus::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    events.subscribe(move |e: &SceneLoadStarted| l.lock().push(format!("started:{}", e.path_or_url)));
    let l = log.clone();
    events.subscribe(move |e: &SceneLoadCompleted| {
        l.lock().push(format!("completed:{}:{}", e.path_or_url, e.node_count))
    });

    let mut session = session_with(events, ImportConfig::default());
    session.import(document(vec![NodeRecord::new("a", "One")])).await;
    session.import(document(vec![NodeRecord::new("b", "Two")])).await;

    assert_eq!(
        *log.lock(),
        vec!["started:", "completed::1", "started:", "completed::1"]
    );
}

#[tokio::test]
async fn test_export_without_scene() {
    let session = session();
    assert!(matches!(session.export(), Err(SceneError::NoActiveScene)));
}

#[tokio::test]
async fn test_portal_transit() {
    let record = NodeRecord::new("a", "Gate").with_component(ComponentSpec::PortalLink(PortalLinkSpec {
        destination_url: "https://spaces.example.com/garden.json".into(),
    }));
    let events = Arc::new(EventBus::new());
    let transits = Arc::new(Mutex::new(Vec::new()));
    let t = transits.clone();
    events.subscribe(move |e: &PortalTransit| t.lock().push(e.clone()));

    let mut session = session_with(events, ImportConfig::default());
    session.import(document(vec![record, NodeRecord::new("b", "Wall")])).await;

    let gate = node(&session, "Gate");
    let wall = node(&session, "Wall");
    assert!(session.trigger_portal(gate, Vec3::new(1.0, 0.0, 2.0), Quat::IDENTITY, Some("player-7")));
    assert!(!session.trigger_portal(wall, Vec3::ZERO, Quat::IDENTITY, None));

    let transits = transits.lock();
    assert_eq!(transits.len(), 1);
    assert_eq!(transits[0].destination_url, "https://spaces.example.com/garden.json");
    assert_eq!(transits[0].portal_id.as_deref(), Some("Gate"));
    assert_eq!(transits[0].player_id.as_deref(), Some("player-7"));
    assert_eq!(transits[0].entry_position, Vec3::new(1.0, 0.0, 2.0));
}
