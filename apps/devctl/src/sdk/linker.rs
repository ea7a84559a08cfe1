//! Management of the per-SDK `current` link.
//!
//! `sdks/<sdk>/current` is the only entry this module ever writes. It is
//! expected to be a symlink to one installed version directory; anything
//! else found at that path (a real directory or file, typically left by a
//! manual copy) is reported and left alone.
//!
//! On Unix the link is replaced atomically: the new link is created under a
//! hidden temporary name and renamed over `current`, so readers observe
//! either the old target or the new one. Windows has no rename-over-symlink,
//! so the old link is removed before the new one is created; if the process
//! dies in between there is no `current` link until `switch` is run again.
//!
//! Two processes switching the same SDK concurrently race; the last rename
//! wins.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::{DevctlError, IoContext, Result};
use crate::sdk::paths::{SdkPaths, file_name_string};

/// Name prefix of the temporary link created while replacing `current`.
pub(crate) const TEMP_LINK_PREFIX: &str = ".current.tmp-";

/// What is currently found at an SDK's `current` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing exists at the path.
    Missing,
    /// A symlink whose target exists.
    Resolving {
        /// The raw link target.
        points_to: PathBuf,
    },
    /// A symlink whose target does not exist.
    Dangling {
        /// The raw link target.
        points_to: PathBuf,
    },
    /// A real directory or file occupies the path.
    Occupied {
        /// Whether the occupant is a directory.
        is_dir: bool,
    },
}

/// What [`switch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// No link existed; one was created.
    Created,
    /// The link already pointed at the requested version.
    Unchanged,
    /// A working link to another version was replaced.
    Replaced {
        /// The previous link target.
        previous: PathBuf,
    },
    /// A dangling link was replaced.
    Repaired {
        /// The previous, missing link target.
        previous: PathBuf,
    },
}

/// Inspects `path` without following a final symlink.
///
/// # Errors
///
/// Returns an error if the path cannot be examined for reasons other than
/// not existing.
pub fn inspect(path: &Path) -> Result<LinkState> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LinkState::Missing),
        Err(e) => return Err(DevctlError::io(format!("failed to stat {}", path.display()), e)),
    };

    if !metadata.file_type().is_symlink() {
        return Ok(LinkState::Occupied {
            is_dir: metadata.is_dir(),
        });
    }

    let points_to = std::fs::read_link(path)
        .io_context(|| format!("failed to read link {}", path.display()))?;
    if target_is_missing(path)? {
        Ok(LinkState::Dangling { points_to })
    } else {
        Ok(LinkState::Resolving { points_to })
    }
}

/// Returns the [`LinkState`] of an SDK's `current` path.
///
/// # Errors
///
/// Returns an error for an invalid sdk name or an unreadable path.
pub fn current_state(paths: &SdkPaths, sdk: &str) -> Result<LinkState> {
    inspect(&paths.current_link_path(sdk)?)
}

/// Points `sdks/<sdk>/current` at `sdks/<sdk>/<version>`.
///
/// | found at `current`        | action                                  |
/// |---------------------------|-----------------------------------------|
/// | nothing                   | create the link                         |
/// | link to the same version  | nothing                                 |
/// | link to another version   | replace the link                        |
/// | dangling link             | replace the link                        |
/// | directory or file         | fail with `CurrentIsNotASymlink`        |
///
/// Install directories are never modified, including the previous target.
///
/// # Errors
///
/// - [`DevctlError::InvalidIdentifier`] for an unsafe sdk or version
/// - [`DevctlError::VersionNotInstalled`] if the version directory is absent
/// - [`DevctlError::CurrentIsNotASymlink`] if `current` is a real entry
/// - [`DevctlError::Io`] if the link cannot be created
pub fn switch(paths: &SdkPaths, sdk: &str, version: &str) -> Result<SwitchOutcome> {
    let target = paths.install_dir(sdk, version)?;
    if !std::fs::metadata(&target).is_ok_and(|m| m.is_dir()) {
        return Err(DevctlError::version_not_installed(sdk, version));
    }

    let link = paths.current_link_path(sdk)?;
    let outcome = match inspect(&link)? {
        LinkState::Occupied { is_dir } => {
            warn!(path = %link.display(), is_dir, "current is not a symlink");
            return Err(DevctlError::current_is_not_a_symlink(link));
        }
        LinkState::Resolving { points_to } if same_location(&link, &target) => {
            debug!(sdk, version, points_to = %points_to.display(), "current already up to date");
            return Ok(SwitchOutcome::Unchanged);
        }
        LinkState::Missing => {
            place_link(&target, &link)?;
            SwitchOutcome::Created
        }
        LinkState::Resolving { points_to } => {
            place_link(&target, &link)?;
            SwitchOutcome::Replaced {
                previous: points_to,
            }
        }
        LinkState::Dangling { points_to } => {
            debug!(points_to = %points_to.display(), "replacing dangling current link");
            place_link(&target, &link)?;
            SwitchOutcome::Repaired {
                previous: points_to,
            }
        }
    };

    info!(sdk, version, link = %link.display(), "switched current version");
    Ok(outcome)
}

/// Returns the version `current` points at, if the link resolves.
///
/// # Errors
///
/// Returns an error for an invalid sdk name or an unreadable path.
pub fn current_version(paths: &SdkPaths, sdk: &str) -> Result<Option<String>> {
    match current_state(paths, sdk)? {
        LinkState::Resolving { points_to } => Ok(file_name_string(&points_to)),
        LinkState::Missing | LinkState::Dangling { .. } | LinkState::Occupied { .. } => Ok(None),
    }
}

/// Removes dangling symlinks directly under `sdks/<sdk>/`.
///
/// Directories, regular files, and symlinks that resolve (including a
/// working `current`) are left untouched. Returns the removed paths.
///
/// # Errors
///
/// Returns an error for an invalid sdk name, an unreadable directory, or a
/// link that cannot be removed.
pub fn remove_broken_symlinks(paths: &SdkPaths, sdk: &str) -> Result<Vec<PathBuf>> {
    let sdk_dir = paths.sdk_dir(sdk)?;
    let entries = match std::fs::read_dir(&sdk_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DevctlError::io(
                format!("failed to read {}", sdk_dir.display()),
                e,
            ));
        }
    };

    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry.io_context(|| format!("failed to read {}", sdk_dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .io_context(|| format!("failed to stat {}", path.display()))?;
        if !file_type.is_symlink() || !target_is_missing(&path)? {
            continue;
        }

        remove_link(&path)?;
        debug!(path = %path.display(), "removed dangling symlink");
        removed.push(path);
    }

    Ok(removed)
}

/// Follows `link` and reports whether its target is absent.
fn target_is_missing(link: &Path) -> Result<bool> {
    match std::fs::metadata(link) {
        Ok(_) => Ok(false),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(true)
        }
        Err(e) => Err(DevctlError::io(
            format!("failed to resolve {}", link.display()),
            e,
        )),
    }
}

fn same_location(link: &Path, target: &Path) -> bool {
    match (std::fs::canonicalize(link), std::fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Creates `link` pointing at `target`, replacing any existing symlink.
#[cfg(unix)]
fn place_link(target: &Path, link: &Path) -> Result<()> {
    let temp = link.with_file_name(format!("{TEMP_LINK_PREFIX}{:016x}", rand::random::<u64>()));
    std::os::unix::fs::symlink(target, &temp).io_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            temp.display(),
            target.display()
        )
    })?;

    if let Err(e) = std::fs::rename(&temp, link) {
        let _ = std::fs::remove_file(&temp);
        return Err(DevctlError::io(
            format!("failed to move symlink into place at {}", link.display()),
            e,
        ));
    }
    Ok(())
}

/// Creates `link` pointing at `target`, replacing any existing symlink.
///
/// Not atomic: the old link is removed first. Re-running `switch` after a
/// crash here restores the link.
#[cfg(windows)]
fn place_link(target: &Path, link: &Path) -> Result<()> {
    if std::fs::symlink_metadata(link).is_ok() {
        remove_link(link)?;
    }
    std::os::windows::fs::symlink_dir(target, link).io_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            link.display(),
            target.display()
        )
    })
}

fn remove_link(path: &Path) -> Result<()> {
    let removed = std::fs::remove_file(path);
    #[cfg(windows)]
    let removed = removed.or_else(|_| std::fs::remove_dir(path));
    removed.io_context(|| format!("failed to remove symlink {}", path.display()))
}
