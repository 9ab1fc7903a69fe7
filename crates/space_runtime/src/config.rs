//! Runtime Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Command line flags: `--max-loads 4 --replace-policy discard-first`
//! 2. Environment variables: `SPACE_MAX_LOADS`, `SPACE_REPLACE_POLICY`,
//!    `SPACE_HTTP_TIMEOUT_SECS`, `SPACE_DEBUG`
//! 3. Config file: `--config <path>`, `SPACE_CONFIG`, or `space.toml` in the
//!    working directory
//! 4. Defaults
//!
//! # Example Config File
//!
//! ```toml
//! debug = false
//!
//! [loader]
//! max_concurrent_loads = 8   # 0 = unbounded
//! http_timeout_secs = 30
//!
//! [import]
//! root_name = "SpaceRoot"
//! replace_policy = "swap-on-success"  # or "discard-first"
//! load_skybox = true
//! script_allow_list = ["OpenOnTouch"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use space_asset::{LoaderConfig, DEFAULT_MAX_CONCURRENT_LOADS};
use space_scene::{ImportConfig, ReplacePolicy, DEFAULT_ROOT_NAME};
use thiserror::Error;

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "space.toml";

pub const ENV_MAX_LOADS: &str = "SPACE_MAX_LOADS";
pub const ENV_REPLACE_POLICY: &str = "SPACE_REPLACE_POLICY";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "SPACE_HTTP_TIMEOUT_SECS";
pub const ENV_DEBUG: &str = "SPACE_DEBUG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Asset loader settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Loads in flight at once; 0 disables the cap
    pub max_concurrent_loads: usize,
    /// Remote request timeout; unset waits indefinitely
    pub http_timeout_secs: Option<u64>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_concurrent_loads: DEFAULT_MAX_CONCURRENT_LOADS,
            http_timeout_secs: None,
        }
    }
}

/// Importer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub root_name: String,
    #[serde(with = "policy_name")]
    pub replace_policy: ReplacePolicy,
    pub load_skybox: bool,
    pub script_allow_list: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            replace_policy: ReplacePolicy::default(),
            load_skybox: true,
            script_allow_list: Vec::new(),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub loader: LoaderSettings,
    pub import: ImportSettings,
    /// Enable debug logging
    pub debug: bool,
    /// File this configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Values given on the command line; `None` leaves lower sources in place
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_concurrent_loads: Option<usize>,
    pub replace_policy: Option<ReplacePolicy>,
    pub http_timeout_secs: Option<u64>,
    pub debug: bool,
    pub script_allow_list: Vec<String>,
}

impl RuntimeConfig {
    /// Read the config file, if any. An explicit path must exist; the
    /// working-directory default is optional.
    pub fn from_file_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load_from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply environment overrides read through `lookup`. Returns a message
    /// for every variable whose value was rejected.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut rejected = Vec::new();

        if let Some(value) = lookup(ENV_MAX_LOADS) {
            match value.trim().parse() {
                Ok(max) => self.loader.max_concurrent_loads = max,
                Err(_) => rejected.push(format!("{}={} is not a count", ENV_MAX_LOADS, value)),
            }
        }

        if let Some(value) = lookup(ENV_REPLACE_POLICY) {
            match value.parse() {
                Ok(policy) => self.import.replace_policy = policy,
                Err(e) => rejected.push(format!("{}: {}", ENV_REPLACE_POLICY, e)),
            }
        }

        if let Some(value) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            match value.trim().parse() {
                Ok(0) => self.loader.http_timeout_secs = None,
                Ok(secs) => self.loader.http_timeout_secs = Some(secs),
                Err(_) => rejected.push(format!("{}={} is not a number of seconds", ENV_HTTP_TIMEOUT_SECS, value)),
            }
        }

        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }

        rejected
    }

    /// Apply process environment overrides
    pub fn apply_process_env(&mut self) -> Vec<String> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply command line overrides
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(max) = overrides.max_concurrent_loads {
            self.loader.max_concurrent_loads = max;
        }
        if let Some(policy) = overrides.replace_policy {
            self.import.replace_policy = policy;
        }
        if let Some(secs) = overrides.http_timeout_secs {
            self.loader.http_timeout_secs = (secs > 0).then_some(secs);
        }
        if overrides.debug {
            self.debug = true;
        }
        for script in &overrides.script_allow_list {
            if !self.import.script_allow_list.contains(script) {
                self.import.script_allow_list.push(script.clone());
            }
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        let config = LoaderConfig::default().with_max_concurrent_loads(self.loader.max_concurrent_loads);
        match self.loader.http_timeout_secs {
            Some(secs) => config.with_http_timeout(Duration::from_secs(secs)),
            None => config,
        }
    }

    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            root_name: self.import.root_name.clone(),
            script_allow_list: self.import.script_allow_list.clone(),
            load_skybox: self.import.load_skybox,
            replace_policy: self.import.replace_policy,
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        log::info!("Runtime Configuration:");
        match self.loader.max_concurrent_loads {
            0 => log::info!("  Max concurrent loads: unbounded"),
            max => log::info!("  Max concurrent loads: {}", max),
        }
        match self.loader.http_timeout_secs {
            Some(secs) => log::info!("  HTTP timeout: {}s", secs),
            None => log::info!("  HTTP timeout: none"),
        }
        log::info!("  Replace policy: {}", self.import.replace_policy);
        log::info!("  Skybox: {}", if self.import.load_skybox { "enabled" } else { "disabled" });
        if !self.import.script_allow_list.is_empty() {
            log::info!("  Allowed scripts: {}", self.import.script_allow_list.join(", "));
        }
        if let Some(path) = &self.config_path {
            log::info!("  Config: {}", path.display());
        }
    }
}

mod policy_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use space_scene::ReplacePolicy;

    pub fn serialize<S: Serializer>(policy: &ReplacePolicy, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(policy)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ReplacePolicy, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.loader.max_concurrent_loads, DEFAULT_MAX_CONCURRENT_LOADS);
        assert_eq!(config.loader.http_timeout_secs, None);
        assert_eq!(config.import.replace_policy, ReplacePolicy::SwapOnSuccess);
        assert!(config.import.load_skybox);
        assert!(!config.debug);
    }

    #[test]
    fn test_parse_toml() {
        let config = RuntimeConfig::from_toml(
            r#"
            debug = true

            [loader]
            max_concurrent_loads = 2
            http_timeout_secs = 15

            [import]
            replace_policy = "discard-first"
            script_allow_list = ["Spin"]
            "#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.loader.max_concurrent_loads, 2);
        assert_eq!(config.loader.http_timeout_secs, Some(15));
        assert_eq!(config.import.replace_policy, ReplacePolicy::DiscardFirst);
        assert_eq!(config.import.script_allow_list, vec!["Spin"]);
        assert_eq!(config.import.root_name, DEFAULT_ROOT_NAME, "missing keys keep defaults");
    }

    #[test]
    fn test_bad_policy_rejected() {
        assert!(RuntimeConfig::from_toml("[import]\nreplace_policy = \"maybe\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RuntimeConfig::default();
        let rejected = config.apply_env(env(&[
            (ENV_MAX_LOADS, "3"),
            (ENV_REPLACE_POLICY, "discard-first"),
            (ENV_HTTP_TIMEOUT_SECS, "10"),
            (ENV_DEBUG, "1"),
        ]));

        assert!(rejected.is_empty());
        assert_eq!(config.loader.max_concurrent_loads, 3);
        assert_eq!(config.import.replace_policy, ReplacePolicy::DiscardFirst);
        assert_eq!(config.loader.http_timeout_secs, Some(10));
        assert!(config.debug);
    }

    #[test]
    fn test_invalid_env_ignored() {
        let mut config = RuntimeConfig::default();
        let rejected = config.apply_env(env(&[(ENV_MAX_LOADS, "lots"), (ENV_REPLACE_POLICY, "never")]));

        assert_eq!(rejected.len(), 2);
        assert_eq!(config.loader.max_concurrent_loads, DEFAULT_MAX_CONCURRENT_LOADS);
        assert_eq!(config.import.replace_policy, ReplacePolicy::SwapOnSuccess);
    }

    #[test]
    fn test_precedence() {
        let mut config = RuntimeConfig::from_toml("[loader]\nmax_concurrent_loads = 2").unwrap();
        config.apply_env(env(&[(ENV_MAX_LOADS, "4")]));
        assert_eq!(config.loader.max_concurrent_loads, 4);

        config.apply_overrides(&Overrides {
            max_concurrent_loads: Some(6),
            ..Default::default()
        });
        assert_eq!(config.loader.max_concurrent_loads, 6);

        config.apply_overrides(&Overrides::default());
        assert_eq!(config.loader.max_concurrent_loads, 6);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("space.toml");
        std::fs::write(&path, "[loader]\nmax_concurrent_loads = 0\n").unwrap();

        let config = RuntimeConfig::from_file_or_default(Some(&path)).unwrap();
        assert_eq!(config.loader.max_concurrent_loads, 0);
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.loader_config().max_concurrent_loads, 0);

        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            RuntimeConfig::from_file_or_default(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_derived_configs() {
        let mut config = RuntimeConfig::default();
        config.loader.http_timeout_secs = Some(5);
        config.import.script_allow_list = vec!["Spin".into()];

        assert_eq!(config.loader_config().http_timeout, Some(Duration::from_secs(5)));
        let import = config.import_config();
        assert!(import.is_script_allowed("Spin"));
        assert_eq!(import.replace_policy, ReplacePolicy::SwapOnSuccess);
    }
}
