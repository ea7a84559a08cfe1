//! Path management for devctl.
//!
//! The default root directory is `~/.devctl/`, which can be overridden by
//! setting the `DEVCTL_HOME` environment variable or passing `--root`.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.devctl/                      # Root directory (or DEVCTL_HOME)
//!   sdks/
//!     go/
//!       1.15/                     # Installed version
//!       1.16.3/
//!       current -> .../1.16.3     # Active version link
//!   downloads/
//!     go/
//!       1.16.3/
//!         go1.16.3.linux-amd64.tar.gz
//!   config.yaml                   # Installed-version index
//! ```
//!
//! Path construction is pure. Every identifier is validated before it is
//! joined onto the root so that a hostile or mistyped sdk/version string can
//! never address anything outside its own directory.

use std::path::{Path, PathBuf};

use crate::errors::{DevctlError, IoContext, Result};

/// Environment variable to override the default root directory.
pub const DEVCTL_HOME_ENV: &str = "DEVCTL_HOME";

/// Name of the per-SDK link pointing at the active version.
pub const CURRENT_LINK_NAME: &str = "current";

/// Name of the configuration file stored at the root.
const CONFIG_FILE: &str = "config.yaml";

/// Marker embedded in staging directory names.
pub(crate) const STAGING_MARKER: &str = ".staging-";

/// Resolves on-disk locations for SDK installs, downloads, and links.
#[derive(Debug, Clone)]
pub struct SdkPaths {
    /// Root directory for all devctl data.
    pub root: PathBuf,
    /// Directory containing one subdirectory per SDK.
    pub sdks: PathBuf,
    /// Directory for cached downloads.
    pub downloads: PathBuf,
}

impl SdkPaths {
    /// Creates a new `SdkPaths` instance.
    ///
    /// The root directory is determined by:
    /// 1. The `DEVCTL_HOME` environment variable if set
    /// 2. `~/.devctl` in the user's home directory
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        if let Some(home) = std::env::var_os(DEVCTL_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(home)));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            DevctlError::config(
                "~",
                "cannot determine home directory; set DEVCTL_HOME or pass --root",
            )
        })?;
        Ok(Self::with_root(home.join(".devctl")))
    }

    /// Creates a new `SdkPaths` instance with a specific root directory.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            sdks: root.join("sdks"),
            downloads: root.join("downloads"),
            root,
        }
    }

    /// Returns `<root>/sdks/<sdk>`.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::InvalidIdentifier`] for an unsafe sdk name.
    pub fn sdk_dir(&self, sdk: &str) -> Result<PathBuf> {
        validate_sdk(sdk)?;
        Ok(self.sdks.join(sdk))
    }

    /// Returns `<root>/sdks/<sdk>/<version>`.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::InvalidIdentifier`] for an unsafe sdk or version.
    pub fn install_dir(&self, sdk: &str, version: &str) -> Result<PathBuf> {
        validate_version(version)?;
        Ok(self.sdk_dir(sdk)?.join(version))
    }

    /// Returns `<root>/downloads/<sdk>/<version>`.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::InvalidIdentifier`] for an unsafe sdk or version.
    pub fn download_dir(&self, sdk: &str, version: &str) -> Result<PathBuf> {
        validate_sdk(sdk)?;
        validate_version(version)?;
        Ok(self.downloads.join(sdk).join(version))
    }

    /// Returns `<root>/sdks/<sdk>/current`.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::InvalidIdentifier`] for an unsafe sdk name.
    pub fn current_link_path(&self, sdk: &str) -> Result<PathBuf> {
        Ok(self.sdk_dir(sdk)?.join(CURRENT_LINK_NAME))
    }

    /// Returns `<root>/downloads/<sdk>/<version>/<filename>`.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::InvalidIdentifier`] for an unsafe sdk, version,
    /// or file name.
    pub fn artifact_path(&self, sdk: &str, version: &str, filename: &str) -> Result<PathBuf> {
        validate_segment("file name", filename)?;
        Ok(self.download_dir(sdk, version)?.join(filename))
    }

    /// Returns the path to the YAML configuration file.
    #[must_use = "returns the path without side effects"]
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Checks if a specific SDK version has an install directory.
    #[must_use = "returns installation status without side effects"]
    pub fn is_version_installed(&self, sdk: &str, version: &str) -> bool {
        self.install_dir(sdk, version)
            .is_ok_and(|dir| dir.is_dir())
    }

    /// Lists the installed versions of an SDK.
    ///
    /// Only real directories count: the `current` link, staging directories,
    /// and any other hidden entries are skipped. Versions are returned in
    /// ascending order (see [`version_cmp`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK directory cannot be read.
    pub fn list_installed_versions(&self, sdk: &str) -> Result<Vec<String>> {
        let sdk_dir = self.sdk_dir(sdk)?;
        if !sdk_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&sdk_dir)
            .io_context(|| format!("failed to read {}", sdk_dir.display()))?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.io_context(|| format!("failed to read {}", sdk_dir.display()))?;
            let file_type = entry
                .file_type()
                .io_context(|| format!("failed to stat {}", entry.path().display()))?;
            if !file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && validate_version(name).is_ok()
            {
                versions.push(name.to_string());
            }
        }

        versions.sort_by(|a, b| version_cmp(a, b));
        Ok(versions)
    }
}

/// Validates an SDK name.
///
/// # Errors
///
/// Returns [`DevctlError::InvalidIdentifier`] if the name is unsafe.
pub fn validate_sdk(sdk: &str) -> Result<()> {
    validate_segment("sdk", sdk)
}

/// Validates a version string.
///
/// Versions are opaque; beyond the path-segment rules the only restriction is
/// that `current` is reserved for the active-version link.
///
/// # Errors
///
/// Returns [`DevctlError::InvalidIdentifier`] if the version is unsafe.
pub fn validate_version(version: &str) -> Result<()> {
    validate_segment("version", version)?;
    if version == CURRENT_LINK_NAME {
        return Err(DevctlError::invalid_identifier(
            "version",
            version,
            "'current' is reserved",
        ));
    }
    Ok(())
}

fn validate_segment(kind: &'static str, value: &str) -> Result<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains(['/', '\\']) {
        "must not contain path separators"
    } else if value.contains("..") {
        "must not contain '..'"
    } else if value.starts_with('.') {
        "must not start with '.'"
    } else if value.contains('\0') {
        "must not contain NUL"
    } else {
        return Ok(());
    };
    Err(DevctlError::invalid_identifier(kind, value, reason))
}

/// Orders version strings, semver-aware where possible.
///
/// Strings like `1.15` are padded to `1.15.0` before parsing. Anything that
/// still fails to parse sorts after all semver versions, lexically.
#[must_use]
pub fn version_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_lenient(version: &str) -> Option<semver::Version> {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    if let Ok(v) = semver::Version::parse(trimmed) {
        return Some(v);
    }
    let dots = trimmed.chars().filter(|c| *c == '.').count();
    let padded = match dots {
        0 => format!("{trimmed}.0.0"),
        1 => format!("{trimmed}.0"),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// Returns `true` for entries devctl creates transiently inside an SDK dir.
pub(crate) fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.contains(STAGING_MARKER)
}

/// Returns the last path component of `path` as a `String`, if UTF-8.
pub(crate) fn file_name_string(path: &Path) -> Option<String> {
    path.file_name()?.to_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn temp_test_dir(name: &str) -> PathBuf {
        env::temp_dir().join(format!("devctl_test_{}_{}", name, rand::random::<u64>()))
    }

    #[test]
    fn with_root_sets_subdirectories() {
        let root = env::temp_dir().join("devctl_test_home");
        let paths = SdkPaths::with_root(root.clone());

        assert_eq!(paths.root, root);
        assert_eq!(paths.sdks, root.join("sdks"));
        assert_eq!(paths.downloads, root.join("downloads"));
        assert_eq!(paths.config_path(), root.join("config.yaml"));
    }

    #[test]
    fn resolver_builds_documented_layout() {
        let root = PathBuf::from("/opt/devctl");
        let paths = SdkPaths::with_root(root.clone());

        assert_eq!(
            paths.install_dir("go", "1.16.3").unwrap(),
            root.join("sdks").join("go").join("1.16.3")
        );
        assert_eq!(
            paths.download_dir("go", "1.16.3").unwrap(),
            root.join("downloads").join("go").join("1.16.3")
        );
        assert_eq!(
            paths.current_link_path("go").unwrap(),
            root.join("sdks").join("go").join("current")
        );
        assert_eq!(
            paths
                .artifact_path("go", "1.16.3", "go1.16.3.linux-amd64.tar.gz")
                .unwrap(),
            root.join("downloads")
                .join("go")
                .join("1.16.3")
                .join("go1.16.3.linux-amd64.tar.gz")
        );
    }

    #[test]
    fn resolver_rejects_traversal_and_separators() {
        let paths = SdkPaths::with_root(PathBuf::from("/opt/devctl"));
        let bad = [
            "..",
            "../1.0",
            "1.0/..",
            "a..b",
            "go/bin",
            "go\\bin",
            "/abs",
            "",
            ".hidden",
            "nul\0byte",
        ];

        for value in bad {
            assert!(
                matches!(
                    paths.install_dir("go", value),
                    Err(DevctlError::InvalidIdentifier { kind: "version", .. })
                ),
                "version {value:?} should be rejected"
            );
            assert!(
                matches!(
                    paths.install_dir(value, "1.0"),
                    Err(DevctlError::InvalidIdentifier { kind: "sdk", .. })
                ),
                "sdk {value:?} should be rejected"
            );
            assert!(paths.download_dir(value, "1.0").is_err());
            assert!(paths.current_link_path(value).is_err());
            assert!(paths.artifact_path("go", "1.0", value).is_err());
        }
    }

    #[test]
    fn current_is_reserved_as_version_only() {
        let paths = SdkPaths::with_root(PathBuf::from("/opt/devctl"));
        assert!(paths.install_dir("go", "current").is_err());
        assert!(paths.sdk_dir("current").is_ok());
    }

    #[test]
    fn distinct_pairs_resolve_to_distinct_dirs() {
        let paths = SdkPaths::with_root(PathBuf::from("/opt/devctl"));
        let a = paths.install_dir("go", "1.16").unwrap();
        let b = paths.install_dir("go", "1.16.3").unwrap();
        let c = paths.install_dir("scala", "1.16").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn is_version_installed_returns_false_for_nonexistent() {
        let paths = SdkPaths::with_root(temp_test_dir("installed"));
        assert!(!paths.is_version_installed("go", "1.16.3"));
        assert!(!paths.is_version_installed("go", "../etc"));
    }

    #[test]
    fn list_installed_versions_returns_empty_when_missing() {
        let paths = SdkPaths::with_root(temp_test_dir("list_empty"));
        assert!(paths.list_installed_versions("go").unwrap().is_empty());
    }

    #[test]
    fn list_installed_versions_skips_links_staging_and_files() {
        let root = temp_test_dir("list_filter");
        let paths = SdkPaths::with_root(root.clone());
        let sdk_dir = paths.sdk_dir("go").unwrap();

        for version in ["1.16.3", "1.9", "1.15", "tip"] {
            std::fs::create_dir_all(sdk_dir.join(version)).unwrap();
        }
        std::fs::create_dir_all(sdk_dir.join(".1.17.staging-abcd")).unwrap();
        std::fs::write(sdk_dir.join("notes.txt"), "x").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(sdk_dir.join("1.15"), sdk_dir.join("current")).unwrap();

        let versions = paths.list_installed_versions("go").unwrap();
        assert_eq!(versions, vec!["1.9", "1.15", "1.16.3", "tip"]);

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn version_cmp_orders_numerically() {
        let mut versions = vec!["1.10", "1.9.2", "1.16.3", "1.16", "beta", "2"];
        versions.sort_by(|a, b| version_cmp(a, b));
        assert_eq!(versions, vec!["1.9.2", "1.10", "1.16", "1.16.3", "2", "beta"]);
    }

    #[test]
    fn staging_names_are_recognised() {
        assert!(is_staging_name(".1.16.3.staging-0123abcd"));
        assert!(!is_staging_name("1.16.3"));
        assert!(!is_staging_name(".current.tmp-1234"));
    }

    #[test]
    #[serial]
    fn new_honours_devctl_home() {
        let root = temp_test_dir("env_home");
        // SAFETY: serialised with other env-mutating tests.
        unsafe { env::set_var(DEVCTL_HOME_ENV, &root) };
        let paths = SdkPaths::new().unwrap();
        unsafe { env::remove_var(DEVCTL_HOME_ENV) };

        assert_eq!(paths.root, root);
    }
}
