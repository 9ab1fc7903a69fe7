//! Two-pass scene importer
//!
//! Rebuilds a live subtree from a [`Document`]:
//!
//! ```text
//! Start → DiscardPreviousRoot → CreateRoot → InstantiateNodes
//!       → PreloadAssets → ApplyTransformsAndComponents → RelinkHierarchy → Done
//! ```
//!
//! Every record first gets a placeholder under the new root. Hierarchy is
//! only wired in the relink pass, once every id maps to a live node, so
//! record order never matters.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use futures_util::future::join;
use futures_util::stream::{FuturesUnordered, StreamExt};
use space_asset::{AssetLoader, AssetResolver, LoadedModel};
use space_document::{ComponentSpec, Document, NodeRecord};

use crate::host::{material_path, ModelReference, SceneHost, Transform};

/// Default name of the node that imported records hang under
pub const DEFAULT_ROOT_NAME: &str = "SpaceRoot";

/// Import state machine phases, in order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportPhase {
    Start,
    DiscardPreviousRoot,
    CreateRoot,
    InstantiateNodes,
    PreloadAssets,
    ApplyTransformsAndComponents,
    RelinkHierarchy,
    Done,
}

impl ImportPhase {
    pub fn next(self) -> Option<Self> {
        use ImportPhase::*;
        match self {
            Start => Some(DiscardPreviousRoot),
            DiscardPreviousRoot => Some(CreateRoot),
            CreateRoot => Some(InstantiateNodes),
            InstantiateNodes => Some(PreloadAssets),
            PreloadAssets => Some(ApplyTransformsAndComponents),
            ApplyTransformsAndComponents => Some(RelinkHierarchy),
            RelinkHierarchy => Some(Done),
            Done => None,
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// When the previous root is destroyed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReplacePolicy {
    /// Destroy the previous root before anything else
    DiscardFirst,
    /// Build the new root first; the previous one goes only once the
    /// import has finished
    #[default]
    SwapOnSuccess,
}

impl FromStr for ReplacePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "discardfirst" | "discard" => Ok(ReplacePolicy::DiscardFirst),
            "swaponsuccess" | "swap" => Ok(ReplacePolicy::SwapOnSuccess),
            other => Err(format!("unknown replace policy '{}'", other)),
        }
    }
}

impl fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacePolicy::DiscardFirst => f.write_str("discard-first"),
            ReplacePolicy::SwapOnSuccess => f.write_str("swap-on-success"),
        }
    }
}

/// Importer settings
#[derive(Clone, Debug)]
pub struct ImportConfig {
    pub root_name: String,
    /// Script identifiers considered trusted. Scripts are recorded either
    /// way; this only affects reporting.
    pub script_allow_list: Vec<String>,
    pub load_skybox: bool,
    pub replace_policy: ReplacePolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            script_allow_list: Vec::new(),
            load_skybox: true,
            replace_policy: ReplacePolicy::default(),
        }
    }
}

impl ImportConfig {
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn with_allowed_script(mut self, script: impl Into<String>) -> Self {
        self.script_allow_list.push(script.into());
        self
    }

    pub fn with_skybox(mut self, load: bool) -> Self {
        self.load_skybox = load;
        self
    }

    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    pub fn is_script_allowed(&self, script: &str) -> bool {
        self.script_allow_list.iter().any(|s| s == script)
    }
}

/// A script identifier found on a record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRecord {
    pub node_id: String,
    pub script: String,
    pub allowed: bool,
}

/// What an import did
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Nodes created for records, root excluded
    pub created: usize,
    pub assets_loaded: usize,
    pub asset_failures: usize,
    pub primitives: usize,
    /// Ids of records that ended up as empty nodes
    pub gaps: Vec<String>,
    /// Ids of records whose parent id matched no record
    pub dangling_parents: Vec<String>,
    /// Type names of components left unapplied
    pub skipped_components: Vec<String>,
    pub scripts: Vec<ScriptRecord>,
    pub skybox_loaded: bool,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "created:            {}", self.created)?;
        writeln!(f, "assets loaded:      {}", self.assets_loaded)?;
        writeln!(f, "asset failures:     {}", self.asset_failures)?;
        writeln!(f, "primitives:         {}", self.primitives)?;
        writeln!(f, "gaps:               {}", self.gaps.len())?;
        writeln!(f, "dangling parents:   {}", self.dangling_parents.len())?;
        writeln!(f, "skipped components: {}", self.skipped_components.len())?;
        writeln!(f, "scripts:            {}", self.scripts.len())?;
        write!(f, "skybox:             {}", if self.skybox_loaded { "loaded" } else { "none" })
    }
}

/// Result of a finished import
#[derive(Clone, Debug)]
pub struct Imported<N> {
    pub root: N,
    pub report: ImportReport,
}

/// Rebuilds live scenes from documents
pub struct SceneImporter<'a> {
    loader: &'a AssetLoader,
    resolver: &'a AssetResolver,
    config: &'a ImportConfig,
}

impl<'a> SceneImporter<'a> {
    pub fn new(loader: &'a AssetLoader, resolver: &'a AssetResolver, config: &'a ImportConfig) -> Self {
        Self {
            loader,
            resolver,
            config,
        }
    }

    /// Import `document` under a new root, replacing `previous` according
    /// to the configured [`ReplacePolicy`]. Per-node problems are logged and
    /// reported; nothing here fails the import.
    pub async fn import<H: SceneHost>(
        &self,
        host: &mut H,
        document: &Document,
        previous: Option<H::Node>,
    ) -> Imported<H::Node> {
        let mut phase = ImportPhase::Start;
        let mut report = ImportReport::default();

        for issue in document.validate() {
            log::warn!("SceneImporter: {}", issue);
        }

        advance(&mut phase);
        let mut previous = previous.filter(|p| host.contains(*p));
        if self.config.replace_policy == ReplacePolicy::DiscardFirst {
            if let Some(old) = previous.take() {
                host.destroy_node(old);
            }
        }

        advance(&mut phase);
        let root = host.create_node(&self.config.root_name, None);

        advance(&mut phase);
        let nodes: Vec<H::Node> = document
            .nodes
            .iter()
            .map(|record| host.create_node(&record.name, Some(root)))
            .collect();
        report.created = nodes.len();

        advance(&mut phase);
        let (mut models, skybox) = join(self.preload(document), self.load_skybox(document)).await;
        if let Some(image) = skybox {
            host.set_skybox(image);
            report.skybox_loaded = true;
        }

        advance(&mut phase);
        for (index, record) in document.nodes.iter().enumerate() {
            let node = nodes[index];
            let model = models.remove(&index);
            self.apply(host, node, record, model, &mut report);
        }

        advance(&mut phase);
        self.relink(host, document, &nodes, &mut report);

        if let Some(old) = previous {
            host.destroy_node(old);
        }

        advance(&mut phase);
        log::info!(
            "SceneImporter: imported '{}' ({} nodes, {} assets, {} primitives, {} gaps)",
            document.metadata.name,
            report.created,
            report.assets_loaded,
            report.primitives,
            report.gaps.len()
        );

        Imported { root, report }
    }

    /// Resolve and load every record's asset concurrently. Keyed by record index.
    async fn preload(&self, document: &Document) -> HashMap<usize, Option<LoadedModel>> {
        let loader = self.loader;
        let mut loads: FuturesUnordered<_> = document
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let resolved = self.resolver.resolve(&document.metadata, record)?;
                log::debug!(
                    "SceneImporter: '{}' resolved to {} via {}",
                    record.name,
                    resolved.location,
                    resolved.tier
                );
                Some((index, record, resolved))
            })
            .map(|(index, record, resolved)| async move {
                let model = loader.load(&record.id, &resolved.location).await;
                (index, model)
            })
            .collect();

        let mut models = HashMap::new();
        while let Some((index, model)) = loads.next().await {
            models.insert(index, model);
        }
        models
    }

    async fn load_skybox(&self, document: &Document) -> Option<space_asset::SkyboxImage> {
        if !self.config.load_skybox {
            return None;
        }
        let locator = document
            .metadata
            .skybox
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        self.loader.load_skybox(locator).await
    }

    fn apply<H: SceneHost>(
        &self,
        host: &mut H,
        node: H::Node,
        record: &NodeRecord,
        model: Option<Option<LoadedModel>>,
        report: &mut ImportReport,
    ) {
        let has_asset = match model {
            Some(Some(model)) => {
                host.attach_model(node, &model.root);
                let mut flags = host.flags(node);
                flags.external_asset_root = true;
                host.set_flags(node, flags);
                report.assets_loaded += 1;
                true
            }
            Some(None) => {
                report.asset_failures += 1;
                false
            }
            None => false,
        };

        if !has_asset {
            let attached = match &record.primitive {
                Some(kind) if kind.is_recognised() => host.attach_primitive(node, kind),
                _ => false,
            };
            if attached {
                report.primitives += 1;
            } else {
                log::warn!(
                    "SceneImporter: reconstruction gap for '{}' ({}): no asset and no usable primitive{}",
                    record.name,
                    record.id,
                    record
                        .primitive
                        .as_ref()
                        .map(|k| format!(" ('{}')", k))
                        .unwrap_or_default()
                );
                report.gaps.push(record.id.clone());
            }
        }

        host.set_transform(
            node,
            Transform {
                translation: record.position.into(),
                rotation: record.rotation.into(),
                scale: record.effective_scale().into(),
            },
        );

        if !has_asset && host.has_renderer(node) {
            apply_materials(host, node, record);
        }

        for component in &record.components {
            match component {
                ComponentSpec::RigidBody(body) => {
                    if !host.add_rigid_body(node, *body) {
                        log::debug!("SceneImporter: '{}' already has a rigid body", record.name);
                    }
                }
                ComponentSpec::Collider(collider) => {
                    // At most one collider; later ones are no-ops
                    host.add_collider(node, *collider);
                }
                ComponentSpec::PortalLink(link) => host.set_portal_link(node, link.clone()),
                ComponentSpec::Unknown(raw) => {
                    log::warn!(
                        "SceneImporter: '{}' has unsupported component '{}'",
                        record.name,
                        raw.type_name
                    );
                    report.skipped_components.push(raw.type_name.clone());
                }
            }
        }

        let reference = ModelReference {
            override_file_path: record.override_file_path.clone(),
            override_remote_url: record.override_remote_url.clone(),
        };
        if !reference.is_empty() {
            host.set_model_reference(node, reference);
        }

        if !record.scripts.is_empty() {
            for script in &record.scripts {
                let allowed = self.config.is_script_allowed(script);
                if allowed {
                    log::info!("SceneImporter: '{}' records script '{}'", record.name, script);
                } else {
                    log::warn!(
                        "SceneImporter: '{}' records script '{}' which is not on the allow-list",
                        record.name,
                        script
                    );
                }
                report.scripts.push(ScriptRecord {
                    node_id: record.id.clone(),
                    script: script.clone(),
                    allowed,
                });
            }
            host.set_scripts(node, record.scripts.clone());
        }
    }

    fn relink<H: SceneHost>(
        &self,
        host: &mut H,
        document: &Document,
        nodes: &[H::Node],
        report: &mut ImportReport,
    ) {
        let by_id: HashMap<&str, H::Node> = document
            .index_by_id()
            .into_iter()
            .map(|(id, index)| (id, nodes[index]))
            .collect();

        for (index, record) in document.nodes.iter().enumerate() {
            let Some(parent_id) = record.parent_id.as_deref() else {
                continue;
            };
            match by_id.get(parent_id) {
                Some(parent) => {
                    if let Err(e) = host.set_parent(nodes[index], Some(*parent)) {
                        log::warn!("SceneImporter: cannot relink '{}': {}", record.name, e);
                    }
                }
                None => {
                    log::warn!(
                        "SceneImporter: '{}' references missing parent '{}', kept under the root",
                        record.name,
                        parent_id
                    );
                    report.dangling_parents.push(record.id.clone());
                }
            }
        }
    }
}

/// Resolve the record's materials; fall back to the default material when
/// none of them exist.
fn apply_materials<H: SceneHost>(host: &mut H, node: H::Node, record: &NodeRecord) {
    let mut materials = Vec::new();
    for name in &record.materials {
        match host.load_material(&material_path(name)) {
            Some(material) => materials.push(material),
            None => log::debug!("SceneImporter: material '{}' not found", name),
        }
    }
    if materials.is_empty() {
        materials.push(host.default_material());
    }
    host.set_materials(node, materials);
}

fn advance(phase: &mut ImportPhase) {
    if let Some(next) = phase.next() {
        log::debug!("SceneImporter: {} -> {}", phase, next);
        *phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phase = ImportPhase::Start;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(seen.last(), Some(&ImportPhase::Done));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_replace_policy_parse() {
        assert_eq!("discard-first".parse::<ReplacePolicy>(), Ok(ReplacePolicy::DiscardFirst));
        assert_eq!("SwapOnSuccess".parse::<ReplacePolicy>(), Ok(ReplacePolicy::SwapOnSuccess));
        assert_eq!("swap_on_success".parse::<ReplacePolicy>(), Ok(ReplacePolicy::SwapOnSuccess));
        assert!("sometimes".parse::<ReplacePolicy>().is_err());
        assert_eq!(ReplacePolicy::default(), ReplacePolicy::SwapOnSuccess);
    }

    #[test]
    fn test_script_allow_list() {
        let config = ImportConfig::default().with_allowed_script("Spin");
        assert!(config.is_script_allowed("Spin"));
        assert!(!config.is_script_allowed("Teleport"));
    }
}
