//! Scene session
//!
//! Owns the host scene graph and at most one imported root at a time,
//! together with the metadata of the document that produced it.

use std::sync::Arc;

use glam::{Quat, Vec3};
use space_asset::{AssetLoader, AssetResolver};
use space_document::{Document, DocumentMetadata};
use space_event::{EventBus, PortalTransit, SceneLoadCompleted, SceneLoadFailed, SceneLoadStarted};

use crate::error::{Result, SceneError};
use crate::exporter::export_scene;
use crate::host::SceneHost;
use crate::importer::{ImportConfig, ImportReport, ReplacePolicy, SceneImporter};

/// Component name reported on portal transits raised by [`Session::trigger_portal`]
pub const PORTAL_TRIGGER: &str = "PortalLink";

/// Active scene plus everything needed to replace or export it
pub struct Session<H: SceneHost> {
    host: H,
    root: Option<H::Node>,
    metadata: DocumentMetadata,
    source: Option<String>,
    loader: AssetLoader,
    resolver: AssetResolver,
    config: ImportConfig,
}

impl<H: SceneHost> Session<H> {
    /// Session resolving assets through the loader's path probe
    pub fn new(host: H, loader: AssetLoader, config: ImportConfig) -> Self {
        let resolver = AssetResolver::new(Arc::clone(loader.probe()));
        Self::with_resolver(host, loader, resolver, config)
    }

    pub fn with_resolver(host: H, loader: AssetLoader, resolver: AssetResolver, config: ImportConfig) -> Self {
        Self {
            host,
            root: None,
            metadata: DocumentMetadata::default(),
            source: None,
            loader,
            resolver,
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Root of the active scene
    pub fn root(&self) -> Option<H::Node> {
        self.root
    }

    /// Metadata of the active document
    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Locator the active document was loaded from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        self.loader.events()
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Read a document from a file path or absolute URL and import it.
    ///
    /// A document that cannot be read or parsed publishes
    /// [`SceneLoadFailed`] and is returned as an error. With
    /// [`ReplacePolicy::SwapOnSuccess`] the previous scene is then still
    /// intact.
    pub async fn load(&mut self, path_or_url: &str) -> Result<ImportReport> {
        log::info!("Session: loading {}", path_or_url);
        self.events().publish(SceneLoadStarted {
            path_or_url: path_or_url.to_string(),
        });

        if self.config.replace_policy == ReplacePolicy::DiscardFirst {
            self.clear();
        }

        let document = match self.read_document(path_or_url).await {
            Ok(document) => document,
            Err(e) => {
                log::error!("Session: failed to load {}: {}", path_or_url, e);
                self.events().publish(SceneLoadFailed {
                    path_or_url: path_or_url.to_string(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        Ok(self.import_from(document, Some(path_or_url.to_string())).await)
    }

    /// Import an already parsed document. Lifecycle events carry an empty
    /// locator.
    pub async fn import(&mut self, document: Document) -> ImportReport {
        self.events().publish(SceneLoadStarted {
            path_or_url: String::new(),
        });
        self.import_from(document, None).await
    }

    /// Export the active scene with the active metadata
    pub fn export(&self) -> Result<Document> {
        let root = self.root.ok_or(SceneError::NoActiveScene)?;
        Ok(export_scene(&self.host, root, self.metadata.clone()))
    }

    /// Destroy the active scene
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            log::debug!("Session: destroying root {:?}", root);
            self.host.destroy_node(root);
        }
        self.metadata = DocumentMetadata::default();
        self.source = None;
    }

    /// Publish a [`PortalTransit`] if `node` carries a portal link.
    /// Returns whether an event was published.
    pub fn trigger_portal(
        &self,
        node: H::Node,
        entry_position: Vec3,
        entry_rotation: Quat,
        player_id: Option<&str>,
    ) -> bool {
        let Some(link) = self.host.portal_link(node) else {
            return false;
        };

        let mut transit = PortalTransit::new(link.destination_url, entry_position, entry_rotation)
            .triggered_by(PORTAL_TRIGGER);
        if let Some(name) = self.host.name(node) {
            transit = transit.with_portal(name);
        }
        if let Some(player) = player_id {
            transit = transit.with_player(player);
        }

        log::info!("Session: portal transit to {}", transit.destination_url);
        self.events().publish(transit);
        true
    }

    async fn read_document(&self, path_or_url: &str) -> Result<Document> {
        let location = self
            .loader
            .classify(path_or_url)
            .ok_or_else(|| SceneError::Unlocatable(path_or_url.to_string()))?;
        let bytes = self.loader.fetch(&location).await?;
        Ok(Document::from_slice(&bytes)?)
    }

    async fn import_from(&mut self, document: Document, source: Option<String>) -> ImportReport {
        let importer = SceneImporter::new(&self.loader, &self.resolver, &self.config);
        let imported = importer.import(&mut self.host, &document, self.root.take()).await;

        self.root = Some(imported.root);
        self.source = source;
        self.metadata = document.metadata;

        self.loader.events().publish(SceneLoadCompleted {
            path_or_url: self.source.clone().unwrap_or_default(),
            scene_name: self.metadata.name.clone(),
            node_count: imported.report.created,
        });

        imported.report
    }
}

impl<H: SceneHost> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.root)
            .field("scene", &self.metadata.name)
            .field("source", &self.source)
            .field("replace_policy", &self.config.replace_policy)
            .finish_non_exhaustive()
    }
}
