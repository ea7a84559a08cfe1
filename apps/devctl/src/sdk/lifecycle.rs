//! End-to-end SDK operations.
//!
//! [`Lifecycle`] ties the path resolver, a [`Downloader`], the archive
//! installer, the linker, and a [`ConfigStore`] together. The config store
//! is only an index: failing to update it is logged and never undoes work
//! already done on disk.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::errors::{DevctlError, IoContext, Result};
use crate::sdk::archive;
use crate::sdk::download::Downloader;
use crate::sdk::linker::{self, LinkState, SwitchOutcome, TEMP_LINK_PREFIX};
use crate::sdk::paths::{SdkPaths, is_staging_name};
use crate::sdk::platform::Platform;
use crate::sdk::registry::Registry;
use crate::sdk::verify::verify_checksum;

/// Result of making a version available on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    /// The install directory.
    pub dir: PathBuf,
    /// `false` if the version was already installed.
    pub fresh: bool,
}

/// Result of [`Lifecycle::use_version`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Used {
    pub installed: Installed,
    pub switch: SwitchOutcome,
}

/// One row of [`Lifecycle::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: String,
    pub current: bool,
}

/// What [`Lifecycle::clean`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Dangling symlinks.
    pub broken_links: Vec<PathBuf>,
    /// Abandoned staging directories and temporary links.
    pub leftovers: Vec<PathBuf>,
}

impl CleanReport {
    /// Returns `true` if nothing was removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.broken_links.is_empty() && self.leftovers.is_empty()
    }
}

/// Orchestrates downloads, installs, and switches for all SDKs.
#[derive(Debug)]
pub struct Lifecycle<D, C> {
    paths: SdkPaths,
    registry: Registry,
    downloader: D,
    config: C,
    platform: Platform,
}

impl<D: Downloader, C: ConfigStore> Lifecycle<D, C> {
    #[must_use]
    pub fn new(
        paths: SdkPaths,
        registry: Registry,
        downloader: D,
        config: C,
        platform: Platform,
    ) -> Self {
        Self {
            paths,
            registry,
            downloader,
            config,
            platform,
        }
    }

    #[must_use = "returns the paths without side effects"]
    pub fn paths(&self) -> &SdkPaths {
        &self.paths
    }

    #[must_use = "returns the registry without side effects"]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Installs `version` if needed, then points `current` at it.
    ///
    /// An already-installed version is never downloaded again, even if its
    /// SDK has no plugin.
    ///
    /// # Errors
    ///
    /// Any download, verification, extraction, or link error. A failure to
    /// update `config.yaml` is logged instead.
    pub async fn use_version(
        &self,
        sdk: &str,
        version: &str,
        checksum: Option<&str>,
    ) -> Result<Used> {
        let installed = self.ensure_installed(sdk, version, checksum).await?;
        let switch = linker::switch(&self.paths, sdk, version)?;
        self.remember("current version", |config| {
            config.record_current(sdk, version, &installed.dir)
        });
        Ok(Used { installed, switch })
    }

    /// Downloads the archive for `version` into the download cache.
    ///
    /// A cached artifact is reused without touching the network. When
    /// `checksum` is given the artifact is verified, and a mismatching file is
    /// deleted so the next attempt downloads it again.
    ///
    /// # Errors
    ///
    /// - [`DevctlError::InvalidIdentifier`] for an unsafe sdk or version
    /// - [`DevctlError::UnknownSdk`] if no plugin handles `sdk`
    /// - [`DevctlError::DownloadFailed`] if the transfer fails
    /// - [`DevctlError::ChecksumMismatch`] if verification fails
    pub async fn download(
        &self,
        sdk: &str,
        version: &str,
        checksum: Option<&str>,
    ) -> Result<PathBuf> {
        let download_dir = self.paths.download_dir(sdk, version)?;
        let plugin = self.registry.get(sdk)?;
        let file_name = plugin.archive_file_name(version, self.platform);
        let artifact = self.paths.artifact_path(sdk, version, &file_name)?;

        if artifact.is_file() {
            info!(sdk, version, artifact = %artifact.display(), "using cached archive");
        } else {
            let url = plugin.download_url(version, self.platform);
            info!(sdk, version, url, "downloading");
            std::fs::create_dir_all(&download_dir)
                .io_context(|| format!("failed to create {}", download_dir.display()))?;
            self.downloader.download(&url, &artifact).await?;
        }

        if let Some(expected) = checksum
            && let Err(e) = verify_checksum(&artifact, expected)
        {
            if matches!(e, DevctlError::ChecksumMismatch { .. }) {
                let _ = std::fs::remove_file(&artifact);
            }
            return Err(e);
        }

        Ok(artifact)
    }

    /// Downloads and installs `version` without changing `current`.
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::download`] and [`archive::install`].
    pub async fn install(
        &self,
        sdk: &str,
        version: &str,
        checksum: Option<&str>,
    ) -> Result<Installed> {
        let installed = self.ensure_installed(sdk, version, checksum).await?;
        if installed.fresh {
            self.remember("installation", |config| {
                config.record_installation(sdk, version, &installed.dir)
            });
        }
        Ok(installed)
    }

    /// Points `current` at an installed version.
    ///
    /// # Errors
    ///
    /// See [`linker::switch`].
    pub fn switch(&self, sdk: &str, version: &str) -> Result<SwitchOutcome> {
        let outcome = linker::switch(&self.paths, sdk, version)?;
        let dir = self.paths.install_dir(sdk, version)?;
        self.remember("current version", |config| {
            config.record_current(sdk, version, &dir)
        });
        Ok(outcome)
    }

    /// Lists installed versions, oldest first, marking the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK directory cannot be read.
    pub fn list(&self, sdk: &str) -> Result<Vec<InstalledVersion>> {
        let current = linker::current_version(&self.paths, sdk)?;
        Ok(self
            .paths
            .list_installed_versions(sdk)?
            .into_iter()
            .map(|version| InstalledVersion {
                current: current.as_deref() == Some(version.as_str()),
                version,
            })
            .collect())
    }

    /// Returns what is found at the SDK's `current` path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be examined.
    pub fn current(&self, sdk: &str) -> Result<LinkState> {
        linker::current_state(&self.paths, sdk)
    }

    /// Removes an installed version.
    ///
    /// Cached downloads are kept.
    ///
    /// # Errors
    ///
    /// - [`DevctlError::VersionNotInstalled`] if there is nothing to remove
    /// - [`DevctlError::VersionInUse`] if `current` points at the version
    pub fn uninstall(&self, sdk: &str, version: &str) -> Result<PathBuf> {
        let dir = self.paths.install_dir(sdk, version)?;
        if !self.paths.is_version_installed(sdk, version) {
            return Err(DevctlError::version_not_installed(sdk, version));
        }
        if linker::current_version(&self.paths, sdk)?.as_deref() == Some(version) {
            return Err(DevctlError::version_in_use(sdk, version));
        }

        std::fs::remove_dir_all(&dir).io_context(|| format!("failed to remove {}", dir.display()))?;
        info!(sdk, version, dir = %dir.display(), "uninstalled");
        self.remember("uninstall", |config| config.forget_installation(sdk, version));
        Ok(dir)
    }

    /// Removes dangling symlinks and leftovers of interrupted runs.
    ///
    /// Staging directories and temporary links are only removed once they
    /// are older than `stale_after`, so an install running concurrently in
    /// another process keeps its staging directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK directory cannot be read or an entry
    /// cannot be removed.
    pub fn clean(&self, sdk: &str, stale_after: Duration) -> Result<CleanReport> {
        let broken_links = linker::remove_broken_symlinks(&self.paths, sdk)?;
        let leftovers = remove_leftovers(&self.paths.sdk_dir(sdk)?, stale_after)?;
        Ok(CleanReport {
            broken_links,
            leftovers,
        })
    }

    async fn ensure_installed(
        &self,
        sdk: &str,
        version: &str,
        checksum: Option<&str>,
    ) -> Result<Installed> {
        let dir = self.paths.install_dir(sdk, version)?;
        if dir.is_dir() {
            debug!(sdk, version, dir = %dir.display(), "already installed");
            return Ok(Installed { dir, fresh: false });
        }

        let artifact = self.download(sdk, version, checksum).await?;
        let dir = archive::install(&self.paths, sdk, version, &artifact)?;
        Ok(Installed { dir, fresh: true })
    }

    fn remember(&self, what: &str, update: impl FnOnce(&C) -> Result<()>) {
        if let Err(e) = update(&self.config) {
            warn!(error = %e, "failed to record {what} in config; disk state is unaffected");
        }
    }
}

fn remove_leftovers(sdk_dir: &Path, stale_after: Duration) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(sdk_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DevctlError::io(
                format!("failed to read {}", sdk_dir.display()),
                e,
            ));
        }
    };

    let now = SystemTime::now();
    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.io_context(|| format!("failed to read {}", sdk_dir.display()))?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let metadata = std::fs::symlink_metadata(&path)
            .io_context(|| format!("failed to stat {}", path.display()))?;

        let is_staging = is_staging_name(&name) && metadata.is_dir();
        let is_temp_link = name.starts_with(TEMP_LINK_PREFIX) && metadata.file_type().is_symlink();
        if !is_staging && !is_temp_link {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < stale_after {
            debug!(path = %path.display(), ?age, "leaving recent leftover in place");
            continue;
        }

        let removal = if is_staging {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removal.io_context(|| format!("failed to remove {}", path.display()))?;
        debug!(path = %path.display(), "removed leftover");
        removed.push(path);
    }

    removed.sort();
    Ok(removed)
}
