//! # space_asset - Asset Resolution and Loading
//!
//! Finds and loads the external models that scene documents refer to.
//!
//! ```text
//! NodeRecord ──► AssetResolver ──► ResolvedLocation { location, tier }
//!                                         │
//!                                         ▼
//!                 AssetLoader (semaphore-gated, async)
//!                   ├── AssetFetcher   file / file:// / http(s)
//!                   ├── ModelDecoder   glTF / GLB structure
//!                   └── EventBus       started → completed | failed
//! ```
//!
//! ```ignore
//! use space_asset::prelude::*;
//!
//! let resolver = AssetResolver::local();
//! let loader = AssetLoader::new(LoaderConfig::default(), events)?;
//! if let Some(resolved) = resolver.resolve(&doc.metadata, &node) {
//!     let model = loader.load(&node.id, &resolved.location).await;
//! }
//! ```

pub mod decoder;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod location;
pub mod resolver;

pub use decoder::{GltfDecoder, ModelDecoder, ModelMesh, ModelNode};
pub use error::{DecodeError, FetchError, LoadError, Result};
pub use fetch::{AssetFetcher, HttpFetcher, LocalFetcher};
pub use loader::{
    add_default_colliders, AssetLoader, LoadedModel, LoaderConfig, SkyboxImage,
    DEFAULT_MAX_CONCURRENT_LOADS,
};
pub use location::{parse_absolute_url, AssetLocation, LocalFileSystem, PathProbe};
pub use resolver::{resolve, AssetResolver, ResolvedLocation, ResolverTier};

/// Prelude
pub mod prelude {
    pub use crate::{
        AssetLoader, AssetLocation, AssetResolver, LoadedModel, LoaderConfig, ModelNode,
        ResolvedLocation, ResolverTier,
    };
}
