//! Asset locations and file-system probing

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Where an asset's bytes live
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetLocation {
    File(PathBuf),
    Url(Url),
}

impl AssetLocation {
    /// Classify a locator string: an existing file wins, then an absolute
    /// URL. Anything else cannot be located.
    pub fn classify(path_or_url: &str, probe: &dyn PathProbe) -> Option<Self> {
        let trimmed = path_or_url.trim();
        if trimmed.is_empty() {
            return None;
        }

        let path = Path::new(trimmed);
        if probe.is_file(path) {
            return Some(AssetLocation::File(path.to_path_buf()));
        }

        parse_absolute_url(trimmed).map(AssetLocation::Url)
    }

    /// File stem of the last path segment, used to name loaded roots
    pub fn file_stem(&self) -> String {
        let stem = match self {
            AssetLocation::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned()),
            AssetLocation::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(|segment| {
                    // Segments arrive percent-encoded; name by the decoded file name
                    let decoded = urlencoding::decode(segment)
                        .map(|d| d.into_owned())
                        .unwrap_or_else(|_| segment.to_string());
                    Path::new(&decoded)
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or(decoded)
                }),
        };
        stem.unwrap_or_else(|| "Asset".to_string())
    }

    pub fn is_remote(&self) -> bool {
        match self {
            AssetLocation::File(_) => false,
            AssetLocation::Url(url) => url.scheme() != "file",
        }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLocation::File(path) => write!(f, "{}", path.display()),
            AssetLocation::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Parse an absolute URL. Single-letter schemes are rejected so that
/// Windows drive paths such as `C:\models\a.glb` are not taken for URLs.
pub fn parse_absolute_url(value: &str) -> Option<Url> {
    Url::parse(value.trim())
        .ok()
        .filter(|url| url.scheme().len() > 1)
}

/// File existence check used by resolution and classification
pub trait PathProbe: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;
}

/// Probe backed by the local file system
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl PathProbe for LocalFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FakeProbe(HashSet<PathBuf>);

    impl PathProbe for FakeProbe {
        fn is_file(&self, path: &Path) -> bool {
            self.0.contains(path)
        }
    }

    #[test]
    fn test_classify() {
        let probe = FakeProbe(["models/chair.glb".into()].into_iter().collect());

        assert_eq!(
            AssetLocation::classify("models/chair.glb", &probe),
            Some(AssetLocation::File("models/chair.glb".into()))
        );
        assert!(matches!(
            AssetLocation::classify("https://cdn.example.com/chair.glb", &probe),
            Some(AssetLocation::Url(_))
        ));
        assert_eq!(AssetLocation::classify("models/missing.glb", &probe), None);
        assert_eq!(AssetLocation::classify("C:\\models\\chair.glb", &probe), None);
        assert_eq!(AssetLocation::classify("   ", &probe), None);
    }

    #[test]
    fn test_file_stem() {
        let file = AssetLocation::File("assets/models/Old Chair.gltf".into());
        assert_eq!(file.file_stem(), "Old Chair");

        let url = AssetLocation::Url(Url::parse("https://cdn.example.com/models/Lamp%20A.glb?v=2").unwrap());
        assert_eq!(url.file_stem(), "Lamp A");

        let invalid_utf8 = AssetLocation::Url(Url::parse("https://cdn.example.com/%FF.glb").unwrap());
        assert_eq!(invalid_utf8.file_stem(), "%FF");

        let bare = AssetLocation::Url(Url::parse("https://cdn.example.com/").unwrap());
        assert_eq!(bare.file_stem(), "Asset");
    }

    #[test]
    fn test_is_remote() {
        assert!(!AssetLocation::File("a.glb".into()).is_remote());
        assert!(!AssetLocation::Url(Url::parse("file:///tmp/a.glb").unwrap()).is_remote());
        assert!(AssetLocation::Url(Url::parse("http://host/a.glb").unwrap()).is_remote());
    }
}
