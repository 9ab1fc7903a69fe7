//! Asynchronous asset loader
//!
//! Every load publishes [`AssetLoadStarted`] followed by exactly one of
//! [`AssetLoadCompleted`] or [`AssetLoadFailed`]. That holds even when the
//! load future is dropped half way: the pending terminal event is then
//! published as a cancellation failure.
//!
//! In-flight loads are capped by a semaphore (`LoaderConfig::max_concurrent_loads`).
//! Decoding runs on tokio's blocking pool.

use std::sync::Arc;
use std::time::Duration;

use space_document::ColliderSpec;
use space_event::{
    AssetLoadCompleted, AssetLoadFailed, AssetLoadStarted, EventBus, SkyboxLoadCompleted,
    SkyboxLoadFailed, SkyboxLoadStarted,
};
use tokio::sync::Semaphore;

use crate::decoder::{GltfDecoder, ModelDecoder, ModelNode};
use crate::error::{DecodeError, FetchError, LoadError, Result};
use crate::fetch::{AssetFetcher, HttpFetcher};
use crate::location::{AssetLocation, LocalFileSystem, PathProbe};

/// Default cap on concurrent loads
pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = 8;

/// Loader configuration
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Maximum loads fetching or decoding at once; 0 disables the cap
    pub max_concurrent_loads: usize,
    /// Timeout for remote requests; `None` waits indefinitely
    pub http_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: DEFAULT_MAX_CONCURRENT_LOADS,
            http_timeout: None,
        }
    }
}

impl LoaderConfig {
    pub fn with_max_concurrent_loads(mut self, max: usize) -> Self {
        self.max_concurrent_loads = max;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }
}

/// A decoded external model, ready to attach under a placeholder
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedModel {
    pub location: AssetLocation,
    /// Root named after the source file stem
    pub root: ModelNode,
}

impl LoadedModel {
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

/// Decoded skybox texture, RGBA8
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkyboxImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Loads external models and skybox images
pub struct AssetLoader {
    fetcher: Arc<dyn AssetFetcher>,
    decoder: Arc<dyn ModelDecoder>,
    probe: Arc<dyn PathProbe>,
    events: Arc<EventBus>,
    permits: Option<Arc<Semaphore>>,
}

impl AssetLoader {
    /// Loader with the HTTP fetcher, glTF decoder and local file system
    pub fn new(config: LoaderConfig, events: Arc<EventBus>) -> std::result::Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.http_timeout)?;
        Ok(Self::with_parts(
            config,
            events,
            Arc::new(fetcher),
            Arc::new(GltfDecoder),
            Arc::new(LocalFileSystem),
        ))
    }

    /// Loader with custom collaborators
    pub fn with_parts(
        config: LoaderConfig,
        events: Arc<EventBus>,
        fetcher: Arc<dyn AssetFetcher>,
        decoder: Arc<dyn ModelDecoder>,
        probe: Arc<dyn PathProbe>,
    ) -> Self {
        let permits = match config.max_concurrent_loads {
            0 => None,
            max => Some(Arc::new(Semaphore::new(max))),
        };
        Self {
            fetcher,
            decoder,
            probe,
            events,
            permits,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn probe(&self) -> &Arc<dyn PathProbe> {
        &self.probe
    }

    /// Classify a locator: existing file first, then absolute URL
    pub fn classify(&self, path_or_url: &str) -> Option<AssetLocation> {
        AssetLocation::classify(path_or_url, self.probe.as_ref())
    }

    /// Fetch raw bytes without decoding, events or concurrency gating
    pub async fn fetch(&self, location: &AssetLocation) -> std::result::Result<Vec<u8>, FetchError> {
        self.fetcher.fetch(location).await
    }

    /// Load one model, publishing lifecycle events. Failures are reported
    /// through [`AssetLoadFailed`] and the log and yield `None`; no retry.
    pub async fn load(&self, asset_id: &str, location: &AssetLocation) -> Option<LoadedModel> {
        let path_or_url = location.to_string();
        self.events.publish(AssetLoadStarted {
            asset_id: asset_id.to_string(),
            path_or_url: path_or_url.clone(),
        });

        let mut pending = PendingTerminal::new(&self.events, asset_id, &path_or_url);

        match self.try_load(location).await {
            Ok(model) => {
                pending.disarm();
                log::info!(
                    "AssetLoader: loaded {} as '{}' ({} nodes)",
                    path_or_url,
                    model.root.name,
                    model.node_count()
                );
                self.events.publish(AssetLoadCompleted {
                    asset_id: asset_id.to_string(),
                    path_or_url,
                    root_name: model.root.name.clone(),
                    node_count: model.node_count(),
                });
                Some(model)
            }
            Err(e) => {
                pending.disarm();
                log::warn!("AssetLoader: failed to load {}: {}", path_or_url, e);
                self.events.publish(AssetLoadFailed {
                    asset_id: asset_id.to_string(),
                    path_or_url,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Load one model without events
    pub async fn try_load(&self, location: &AssetLocation) -> Result<LoadedModel> {
        let _permit = match &self.permits {
            Some(permits) => Some(permits.acquire().await.map_err(|_| LoadError::Closed)?),
            None => None,
        };

        let bytes = self.fetcher.fetch(location).await?;

        let decoder = Arc::clone(&self.decoder);
        let decode_location = location.clone();
        let mut root = tokio::task::spawn_blocking(move || decoder.decode(&bytes, &decode_location))
            .await
            .map_err(|e| LoadError::Task(e.to_string()))??;

        root.name = location.file_stem();
        add_default_colliders(&mut root);

        Ok(LoadedModel {
            location: location.clone(),
            root,
        })
    }

    /// Load a skybox image from a local path or URL, publishing skybox
    /// lifecycle events.
    pub async fn load_skybox(&self, path_or_url: &str) -> Option<SkyboxImage> {
        self.events.publish(SkyboxLoadStarted {
            path_or_url: path_or_url.to_string(),
        });

        match self.try_load_skybox(path_or_url).await {
            Ok(image) => {
                log::info!(
                    "AssetLoader: skybox {} loaded ({}x{})",
                    path_or_url,
                    image.width,
                    image.height
                );
                self.events.publish(SkyboxLoadCompleted {
                    path_or_url: path_or_url.to_string(),
                    width: image.width,
                    height: image.height,
                });
                Some(image)
            }
            Err(e) => {
                log::warn!("AssetLoader: skybox {} failed: {}", path_or_url, e);
                self.events.publish(SkyboxLoadFailed {
                    path_or_url: path_or_url.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn try_load_skybox(&self, path_or_url: &str) -> Result<SkyboxImage> {
        let location = self
            .classify(path_or_url)
            .ok_or_else(|| LoadError::Unlocatable(path_or_url.to_string()))?;

        let _permit = match &self.permits {
            Some(permits) => Some(permits.acquire().await.map_err(|_| LoadError::Closed)?),
            None => None,
        };

        let bytes = self.fetcher.fetch(&location).await?;
        tokio::task::spawn_blocking(move || decode_skybox(&bytes))
            .await
            .map_err(|e| LoadError::Task(e.to_string()))?
            .map_err(LoadError::from)
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("max_concurrent_loads", &self.permits.as_ref().map(|p| p.available_permits()))
            .finish_non_exhaustive()
    }
}

fn decode_skybox(bytes: &[u8]) -> std::result::Result<SkyboxImage, DecodeError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(SkyboxImage {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Give every mesh node without a collider a non-convex mesh collider
pub fn add_default_colliders(root: &mut ModelNode) {
    root.walk_mut(&mut |node| {
        if node.mesh.is_some() && node.collider.is_none() {
            node.collider = Some(ColliderSpec::default_mesh());
        }
    });
}

/// Publishes a cancellation failure if the load is dropped before it
/// reaches a terminal event.
struct PendingTerminal {
    events: Arc<EventBus>,
    asset_id: String,
    path_or_url: String,
    armed: bool,
}

impl PendingTerminal {
    fn new(events: &Arc<EventBus>, asset_id: &str, path_or_url: &str) -> Self {
        Self {
            events: Arc::clone(events),
            asset_id: asset_id.to_string(),
            path_or_url: path_or_url.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingTerminal {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("AssetLoader: load of {} cancelled", self.path_or_url);
            self.events.publish(AssetLoadFailed {
                asset_id: std::mem::take(&mut self.asset_id),
                path_or_url: std::mem::take(&mut self.path_or_url),
                error: LoadError::Cancelled.to_string(),
            });
        }
    }
}
