//! Byte fetchers for local and remote locations

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::error::FetchError;
use crate::location::AssetLocation;

/// Produces the raw bytes behind an asset location
pub trait AssetFetcher: Send + Sync {
    fn fetch<'a>(&'a self, location: &'a AssetLocation) -> BoxFuture<'a, Result<Vec<u8>, FetchError>>;
}

/// Reads files and `file://` URLs
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFetcher;

impl LocalFetcher {
    async fn read(path: &Path) -> Result<Vec<u8>, FetchError> {
        tokio::fs::read(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FetchError::NotFound(path.to_path_buf())
            } else {
                FetchError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }

    fn local_path(location: &AssetLocation) -> Result<PathBuf, FetchError> {
        match location {
            AssetLocation::File(path) => Ok(path.clone()),
            AssetLocation::Url(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| FetchError::UnsupportedLocation(url.to_string())),
            AssetLocation::Url(url) => Err(FetchError::UnsupportedLocation(url.to_string())),
        }
    }
}

impl AssetFetcher for LocalFetcher {
    fn fetch<'a>(&'a self, location: &'a AssetLocation) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            let path = Self::local_path(location)?;
            Self::read(&path).await
        })
    }
}

/// Fetches `http(s)` URLs with reqwest; local locations go to [`LocalFetcher`]
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| FetchError::Network {
            url: String::new(),
            source,
        })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &url::Url) -> Result<Vec<u8>, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        Ok(bytes.to_vec())
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, location: &'a AssetLocation) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
        Box::pin(async move {
            match location {
                AssetLocation::Url(url) if matches!(url.scheme(), "http" | "https") => self.get(url).await,
                other => LocalFetcher.fetch(other).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn test_local_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.gltf");
        std::fs::write(&path, b"{}").unwrap();

        let bytes = LocalFetcher.fetch(&AssetLocation::File(path.clone())).await.unwrap();
        assert_eq!(bytes, b"{}");

        let file_url = Url::from_file_path(&path).unwrap();
        let bytes = LocalFetcher.fetch(&AssetLocation::Url(file_url)).await.unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFetcher
            .fetch(&AssetLocation::File(dir.path().join("absent.glb")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_local_fetcher_rejects_http() {
        let location = AssetLocation::Url(Url::parse("https://cdn.example.com/a.glb").unwrap());
        let err = LocalFetcher.fetch(&location).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedLocation(_)));
    }

    #[tokio::test]
    async fn test_http_fetcher_reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sky.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let fetcher = HttpFetcher::new(None).unwrap();
        let bytes = fetcher.fetch(&AssetLocation::File(path)).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
