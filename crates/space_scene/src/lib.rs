//! # space_scene - Scene Export and Import
//!
//! Turns live scenes into documents and back, through capability traits a
//! host engine implements.
//!
//! ```text
//! Session<H: SceneHost>
//! ├── load(path_or_url) ──► Document ──► SceneImporter ──► live root
//! │                                        ├── AssetResolver / AssetLoader
//! │                                        └── relink pass
//! ├── export() ──► export_scene ──► Document
//! └── trigger_portal() ──► PortalTransit
//! ```
//!
//! [`SceneGraph`] is an in-memory host used by the CLI and the tests.
//!
//! ```ignore
//! use space_scene::prelude::*;
//!
//! let mut session = Session::new(SceneGraph::new(), loader, ImportConfig::default());
//! let report = session.load("lobby.json").await?;
//! let document = session.export()?;
//! ```

pub mod error;
pub mod exporter;
pub mod graph;
pub mod host;
pub mod importer;
pub mod session;

pub use error::{Result, SceneError};
pub use exporter::export_scene;
pub use graph::{Material, MaterialId, MeshInfo, NodeId, SceneGraph};
pub use host::{
    material_path, ModelReference, NodeFlags, PhysicsCapability, RenderCapability, SceneHost,
    SceneProvider, Transform, DEFAULT_MATERIAL_COLOR, DEFAULT_MATERIAL_NAME, MATERIALS_FOLDER,
};
pub use importer::{
    ImportConfig, ImportPhase, ImportReport, Imported, ReplacePolicy, SceneImporter, ScriptRecord,
    DEFAULT_ROOT_NAME,
};
pub use session::{Session, PORTAL_TRIGGER};

/// Prelude
pub mod prelude {
    pub use crate::host::{PhysicsCapability, RenderCapability, SceneHost, SceneProvider};
    pub use crate::{
        export_scene, ImportConfig, ImportReport, ReplacePolicy, SceneError, SceneGraph,
        SceneImporter, Session,
    };
}
