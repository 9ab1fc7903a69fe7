//! Asset resolver
//!
//! Picks the location of a node's external model. Tiers are tried in order
//! and the first hit wins:
//!
//! ```text
//! 1. OverrideFile   override_file_path, if the file exists
//! 2. OverrideUrl    override_remote_url, if it is an absolute URL
//! 3. LocalGltf      <local base>/<canonical name>.gltf, if it exists
//! 4. LocalGlb       <local base>/<canonical name>.glb, if it exists
//! 5. RemoteBase     <remote base>/<canonical name>.gltf
//! ```
//!
//! Remote locations are never checked for existence; a missing remote model
//! surfaces later as a load failure.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use space_document::{canonical_name, DocumentMetadata, NodeRecord};

use crate::location::{parse_absolute_url, AssetLocation, LocalFileSystem, PathProbe};

/// Which rule produced a location
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolverTier {
    OverrideFile = 1,
    OverrideUrl = 2,
    LocalGltf = 3,
    LocalGlb = 4,
    RemoteBase = 5,
}

impl fmt::Display for ResolverTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolverTier::OverrideFile => "override file",
            ResolverTier::OverrideUrl => "override URL",
            ResolverTier::LocalGltf => "local .gltf",
            ResolverTier::LocalGlb => "local .glb",
            ResolverTier::RemoteBase => "remote base",
        };
        write!(f, "tier {} ({})", *self as u8, name)
    }
}

/// A location together with the tier that chose it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub location: AssetLocation,
    pub tier: ResolverTier,
}

/// Resolves node records to asset locations
#[derive(Clone)]
pub struct AssetResolver {
    probe: Arc<dyn PathProbe>,
}

impl AssetResolver {
    pub fn new(probe: Arc<dyn PathProbe>) -> Self {
        Self { probe }
    }

    /// Resolver that checks the local file system
    pub fn local() -> Self {
        Self::new(Arc::new(LocalFileSystem))
    }

    pub fn probe(&self) -> &Arc<dyn PathProbe> {
        &self.probe
    }

    /// Resolve one node. Deterministic for a given document and file system.
    pub fn resolve(&self, metadata: &DocumentMetadata, node: &NodeRecord) -> Option<ResolvedLocation> {
        resolve(metadata, node, self.probe.as_ref())
    }
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetResolver").finish_non_exhaustive()
    }
}

/// Resolve one node against document settings using `probe` for existence
/// checks. Returns `None` when no tier applies.
pub fn resolve(
    metadata: &DocumentMetadata,
    node: &NodeRecord,
    probe: &dyn PathProbe,
) -> Option<ResolvedLocation> {
    let hit = |location, tier| Some(ResolvedLocation { location, tier });

    if let Some(file) = non_empty(node.override_file_path.as_deref()) {
        let path = Path::new(file);
        if probe.is_file(path) {
            return hit(AssetLocation::File(path.to_path_buf()), ResolverTier::OverrideFile);
        }
        log::debug!(
            "AssetResolver: override file {} for '{}' does not exist",
            path.display(),
            node.name
        );
    }

    if let Some(raw) = non_empty(node.override_remote_url.as_deref()) {
        match parse_absolute_url(raw) {
            Some(url) => return hit(AssetLocation::Url(url), ResolverTier::OverrideUrl),
            None => log::warn!(
                "AssetResolver: ignoring override URL '{}' on '{}': not an absolute URL",
                raw,
                node.name
            ),
        }
    }

    let name = canonical_name(&node.name);
    if name.is_empty() {
        return None;
    }

    if let Some(base) = non_empty(metadata.local_base_dir.as_deref()) {
        for (extension, tier) in [("gltf", ResolverTier::LocalGltf), ("glb", ResolverTier::LocalGlb)] {
            let candidate: PathBuf = Path::new(base).join(format!("{}.{}", name, extension));
            if probe.is_file(&candidate) {
                return hit(AssetLocation::File(candidate), tier);
            }
        }
    }

    if let Some(base) = non_empty(metadata.remote_base_url.as_deref()) {
        let composed = format!("{}/{}.gltf", base.trim_end_matches('/'), name);
        match parse_absolute_url(&composed) {
            Some(url) => return hit(AssetLocation::Url(url), ResolverTier::RemoteBase),
            None => log::warn!(
                "AssetResolver: remote base '{}' does not form a valid URL for '{}'",
                base,
                name
            ),
        }
    }

    None
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
