//! The `config.yaml` index.
//!
//! The config records which SDK versions have been installed and which one
//! is current, and lets users declare additional SDK plugins:
//!
//! ```yaml
//! sdks:
//!   go:
//!     current: 1.16.3
//!     installations:
//!       '1.15': /home/me/.devctl/sdks/go/1.15
//!       1.16.3: /home/me/.devctl/sdks/go/1.16.3
//! plugins:
//!   node:
//!     description: Node.js runtime
//!     url: https://nodejs.org/dist/v{version}/node-v{version}-{os}-{arch}.{ext}
//!     env:
//!       NODE_HOME: ""
//!     bin: [bin]
//! ```
//!
//! The file is a convenience index. What is on disk under `sdks/` is
//! authoritative, and the index is allowed to drift from it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{DevctlError, IoContext, Result};

/// Root of `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Per-SDK installation records.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sdks: BTreeMap<String, SdkRecord>,
    /// User-declared SDK plugins.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, PluginConfig>,
}

/// What the index knows about one SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkRecord {
    /// The version `current` was last switched to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    /// Installed versions and their directories.
    #[serde(default)]
    pub installations: BTreeMap<String, PathBuf>,
}

/// A data-driven SDK plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Download URL template. Supports `{version}`, `{os}`, `{arch}`, `{ext}`.
    pub url: String,
    /// One-line description shown by `devctl sdks`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Environment variables to export, as paths relative to the current link.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Directories relative to the current link to prepend to `PATH`.
    #[serde(default = "default_bin_dirs")]
    pub bin: Vec<String>,
}

fn default_bin_dirs() -> Vec<String> {
    vec!["bin".to_string()]
}

/// Persistence for [`Config`].
///
/// The record helpers load, mutate, and save. They are not atomic with
/// respect to other processes writing the same file.
pub trait ConfigStore {
    /// Loads the config; a missing file is an empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<Config>;

    /// Persists the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    fn save(&self, config: &Config) -> Result<()>;

    /// Records `version` as current and installed at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails.
    fn record_current(&self, sdk: &str, version: &str, path: &Path) -> Result<()> {
        let mut config = self.load()?;
        let record = config.sdks.entry(sdk.to_string()).or_default();
        record.current = Some(version.to_string());
        record
            .installations
            .insert(version.to_string(), path.to_path_buf());
        self.save(&config)
    }

    /// Records `version` as installed at `path` without changing current.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails.
    fn record_installation(&self, sdk: &str, version: &str, path: &Path) -> Result<()> {
        let mut config = self.load()?;
        config
            .sdks
            .entry(sdk.to_string())
            .or_default()
            .installations
            .insert(version.to_string(), path.to_path_buf());
        self.save(&config)
    }

    /// Drops `version` from the index, clearing current if it matched.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails.
    fn forget_installation(&self, sdk: &str, version: &str) -> Result<()> {
        let mut config = self.load()?;
        let Some(record) = config.sdks.get_mut(sdk) else {
            return Ok(());
        };
        record.installations.remove(version);
        if record.current.as_deref() == Some(version) {
            record.current = None;
        }
        if record.installations.is_empty() && record.current.is_none() {
            config.sdks.remove(sdk);
        }
        self.save(&config)
    }
}

/// [`ConfigStore`] backed by a YAML file.
#[derive(Debug, Clone)]
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    /// Creates a store for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the config file location.
    #[must_use = "returns the path without side effects"]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<Config> {
        let yaml = match std::fs::read_to_string(&self.path) {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(DevctlError::io(
                    format!("failed to read {}", self.path.display()),
                    e,
                ));
            }
        };

        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&yaml).map_err(|e| DevctlError::config(&self.path, e.to_string()))
    }

    fn save(&self, config: &Config) -> Result<()> {
        let yaml = serde_yaml::to_string(config)
            .map_err(|e| DevctlError::config(&self.path, e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .io_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(format!(".tmp-{:016x}", rand::random::<u64>()));
        let temp = self.path.with_file_name(temp_name);

        std::fs::write(&temp, yaml).io_context(|| format!("failed to write {}", temp.display()))?;
        if let Err(e) = std::fs::rename(&temp, &self.path) {
            let _ = std::fs::remove_file(&temp);
            return Err(DevctlError::io(
                format!("failed to replace {}", self.path.display()),
                e,
            ));
        }
        debug!(path = %self.path.display(), "saved config");
        Ok(())
    }
}
