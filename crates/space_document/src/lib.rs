//! # space_document - Portable Scene Documents
//!
//! The serializable form of a live scene:
//!
//! ```text
//! Document
//! ├── DocumentMetadata  (name, rating, language, asset base locations, skybox)
//! └── nodes: [NodeRecord]
//!     ├── id / parent_id      flat list, hierarchy by id reference
//!     ├── transform           position, rotation (degrees), scale
//!     ├── primitive / overrides / materials
//!     ├── components: [ComponentSpec]
//!     └── scripts             recorded, never executed
//! ```
//!
//! ```ignore
//! use space_document::prelude::*;
//!
//! let doc = Document::read_from("lobby.json")?;
//! for issue in doc.validate() {
//!     log::warn!("{}", issue);
//! }
//! ```

pub mod component;
pub mod document;
pub mod error;
pub mod metadata;
pub mod naming;

pub use component::{
    CapsuleAxis, ColliderShape, ColliderSpec, ComponentSpec, PortalLinkSpec, Property,
    RawComponent, RigidBodySpec,
};
pub use document::{
    Document, DocumentMetadata, ModelSource, NodeRecord, PrimitiveKind, ValidationIssue, Vec3,
};
pub use error::{DocumentError, Result};
pub use metadata::{ContentRating, Language};
pub use naming::canonical_name;

/// Prelude
pub mod prelude {
    pub use crate::component::{ColliderShape, ColliderSpec, ComponentSpec, RigidBodySpec};
    pub use crate::document::{Document, DocumentMetadata, NodeRecord, PrimitiveKind, Vec3};
    pub use crate::error::DocumentError;
    pub use crate::naming::canonical_name;
}
