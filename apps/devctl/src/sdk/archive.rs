//! Archive extraction and staged installation.
//!
//! [`install`] never extracts into the final install directory. It unpacks
//! into a hidden staging directory beside it and renames that directory into
//! place only once extraction has finished, so an install directory is either
//! absent or complete.
//!
//! Most vendor archives wrap everything in one top-level folder (`go/bin/go`,
//! `go/src/...`). When every entry shares such a folder it is stripped, so
//! `bin/` lands directly under the version directory. Archives without a
//! shared folder are extracted as-is.

use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info, warn};

use crate::errors::{DevctlError, IoContext, Result};
use crate::sdk::paths::{STAGING_MARKER, SdkPaths};

/// Extracts `archive_path` and installs it as `sdk` `version`.
///
/// Returns the install directory on success.
///
/// # Errors
///
/// - [`DevctlError::InvalidIdentifier`] for an unsafe sdk or version
/// - [`DevctlError::ExtractionFailed`] if the archive cannot be unpacked;
///   the staging directory is removed before returning
/// - [`DevctlError::PromotionFailed`] if the finished staging directory
///   cannot be moved into place (for example when a concurrent run won)
pub fn install(
    paths: &SdkPaths,
    sdk: &str,
    version: &str,
    archive_path: &Path,
) -> Result<PathBuf> {
    let target = paths.install_dir(sdk, version)?;
    let sdk_dir = paths.sdk_dir(sdk)?;
    std::fs::create_dir_all(&sdk_dir)
        .io_context(|| format!("failed to create {}", sdk_dir.display()))?;

    let staging = sdk_dir.join(format!(
        ".{version}{STAGING_MARKER}{:016x}",
        rand::random::<u64>()
    ));
    debug!(
        archive = %archive_path.display(),
        staging = %staging.display(),
        "extracting into staging directory"
    );

    let extracted = extract_archive(archive_path, &staging).and_then(|()| {
        if dir_is_empty(&staging)? {
            bail!("archive contains no files");
        }
        Ok(())
    });
    if let Err(e) = extracted {
        remove_staging(&staging);
        return Err(DevctlError::extraction_failed(sdk, version, archive_path, e));
    }

    promote(&staging, &target)?;
    info!(sdk, version, dir = %target.display(), "installed");
    Ok(target)
}

/// Moves a finished staging directory to its final location.
fn promote(staging: &Path, target: &Path) -> Result<()> {
    match std::fs::rename(staging, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            warn!(
                staging = %staging.display(),
                target = %target.display(),
                "staging directory is on another device, copying instead of renaming"
            );
            let copied = copy_dir_all(staging, target);
            remove_staging(staging);
            copied.map_err(|source| {
                let _ = std::fs::remove_dir_all(target);
                DevctlError::PromotionFailed {
                    staging: staging.to_path_buf(),
                    target: target.to_path_buf(),
                    source,
                }
            })
        }
        Err(source) => {
            remove_staging(staging);
            Err(DevctlError::PromotionFailed {
                staging: staging.to_path_buf(),
                target: target.to_path_buf(),
                source,
            })
        }
    }
}

fn remove_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging)
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(staging = %staging.display(), error = %e, "failed to remove staging directory");
    }
}

fn dir_is_empty(dir: &Path) -> anyhow::Result<bool> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    Ok(entries.next().is_none())
}

/// Recursively copies `src` to `dst`, preserving symlinks as symlinks.
fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_all(&from, &to)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(&from)?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &to)?;
            #[cfg(windows)]
            std::fs::copy(from.parent().unwrap_or(src).join(link), &to).map(|_| ())?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Extracts an archive (ZIP or tar.gz) to the destination directory.
///
/// The format is chosen from the file extension: `.tar.gz` and `.tgz` are
/// read as gzipped tarballs, anything else as ZIP.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or read, if an entry
/// escapes the destination, or if writing to the destination fails.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> anyhow::Result<()> {
    let path_str = archive_path.to_string_lossy();
    if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest_dir)
    } else {
        extract_zip(archive_path, dest_dir)
    }
}

/// Extracts a tar.gz archive to the destination directory.
///
/// Creates the destination directory if it does not exist. A common root
/// folder shared by all entries is stripped. Symlinks are kept when their
/// target stays inside the destination; hard links are recreated against
/// files already extracted. Nothing is ever written through a symlink.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, contains absolute or
/// parent-relative paths, has a link pointing outside the destination, or
/// cannot be written out.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let strip_prefix = find_common_root_folder_tar(archive_path)?;
    if let Some(prefix) = &strip_prefix {
        debug!(prefix = %prefix.display(), "stripping common archive root");
    }

    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        let entry_path = normalize(
            &entry
                .path()
                .with_context(|| "Failed to get entry path")?,
        );
        reject_escaping_path(&entry_path)?;

        let Some(relative_path) = strip_root(&entry_path, strip_prefix.as_deref()) else {
            continue;
        };
        reject_symlinked_ancestors(dest_dir, &relative_path)?;
        let output_path = dest_dir.join(&relative_path);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }
        create_parent_dir(&output_path)?;

        if entry_type.is_symlink() {
            let target = link_target(&entry, &entry_path)?;
            check_symlink_target(&relative_path, &target)?;
            entry
                .unpack(&output_path)
                .with_context(|| format!("Failed to create symlink: {}", output_path.display()))?;
        } else if entry_type.is_hard_link() {
            let target = link_target(&entry, &entry_path)?;
            let source = hard_link_source(dest_dir, &target, strip_prefix.as_deref())?;
            std::fs::hard_link(&source, &output_path).with_context(|| {
                format!(
                    "Failed to link {} to {}",
                    output_path.display(),
                    source.display()
                )
            })?;
        } else if entry_type.is_file() || entry_type.is_contiguous() || entry_type.is_gnu_sparse()
        {
            entry
                .unpack(&output_path)
                .with_context(|| format!("Failed to extract: {}", output_path.display()))?;
        } else {
            debug!(path = %entry_path.display(), ?entry_type, "skipping unsupported tar entry");
        }
    }

    Ok(())
}

fn link_target<R: Read>(entry: &tar::Entry<'_, R>, entry_path: &Path) -> anyhow::Result<PathBuf> {
    entry
        .link_name()
        .with_context(|| format!("Failed to read link target of {}", entry_path.display()))?
        .map(std::borrow::Cow::into_owned)
        .with_context(|| format!("Link entry without a target: {}", entry_path.display()))
}

/// Resolves a hard link's target to a file already extracted under
/// `dest_dir`, applying the same root stripping as entry paths.
fn hard_link_source(
    dest_dir: &Path,
    target: &Path,
    prefix: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let target = normalize(target);
    reject_escaping_path(&target)?;
    let relative = strip_root(&target, prefix)
        .with_context(|| format!("Hard link points at the archive root: {}", target.display()))?;
    reject_symlinked_ancestors(dest_dir, &relative)?;

    let source = dest_dir.join(&relative);
    let is_file = std::fs::symlink_metadata(&source).is_ok_and(|meta| meta.is_file());
    if !is_file {
        bail!(
            "Hard link target is not an extracted file: {}",
            target.display()
        );
    }
    Ok(source)
}

/// Extracts a ZIP archive to the destination directory.
///
/// Creates the destination directory if it does not exist. A common root
/// folder shared by all entries is stripped. On Unix, recorded permission
/// bits are restored and symlink entries are recreated as symlinks when
/// their target stays inside the destination.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, contains unsafe paths or
/// links, or cannot be written out.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;

    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    let strip_prefix = find_common_root_folder_zip(&mut archive);

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        let entry_path = normalize(
            &entry
                .enclosed_name()
                .with_context(|| format!("Invalid entry path in archive: entry {i}"))?,
        );
        reject_escaping_path(&entry_path)?;

        let Some(relative_path) = strip_root(&entry_path, strip_prefix.as_deref()) else {
            continue;
        };
        reject_symlinked_ancestors(dest_dir, &relative_path)?;
        let output_path = dest_dir.join(&relative_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }
        create_parent_dir(&output_path)?;

        if entry.unix_mode().is_some_and(is_symlink_mode) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .with_context(|| format!("Failed to read link target of {}", entry_path.display()))?;
            let target = PathBuf::from(target);
            check_symlink_target(&relative_path, &target)?;
            create_symlink(&target, &output_path)?;
            continue;
        }

        let mut outfile = std::fs::File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&output_path, std::fs::Permissions::from_mode(mode))
                .with_context(|| {
                    format!("Failed to set permissions: {}", output_path.display())
                })?;
        }
    }

    Ok(())
}

/// `S_IFLNK` in the file-type bits of a unix mode.
fn is_symlink_mode(mode: u32) -> bool {
    mode & 0o170_000 == 0o120_000
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> anyhow::Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("Failed to create symlink: {}", link.display()))
}

#[cfg(not(unix))]
fn create_symlink(_target: &Path, link: &Path) -> anyhow::Result<()> {
    bail!(
        "Symlink entries are not supported on this platform: {}",
        link.display()
    )
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Fails if any existing component of `relative` below `dest_dir`,
/// including the entry itself, is a symlink.
fn reject_symlinked_ancestors(dest_dir: &Path, relative: &Path) -> anyhow::Result<()> {
    let mut current = dest_dir.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => bail!(
                "Refusing to extract through symlink: {}",
                current.display()
            ),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect: {}", current.display()));
            }
        }
    }
    Ok(())
}

/// Accepts a symlink at `link` (relative to the extraction root) only if its
/// target stays below the root. `..` may appear only as a leading run, so
/// the climb happens through real directories before any link is followed.
fn check_symlink_target(link: &Path, target: &Path) -> anyhow::Result<()> {
    let escapes = || {
        anyhow::anyhow!(
            "Refusing symlink that points outside the install directory: {} -> {}",
            link.display(),
            target.display()
        )
    };

    let mut depth = link.components().count().saturating_sub(1);
    let mut descended = false;
    for component in target.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => descended = true,
            Component::ParentDir if !descended && depth > 0 => depth -= 1,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escapes());
            }
        }
    }
    if target.as_os_str().is_empty() {
        return Err(escapes());
    }
    Ok(())
}

/// Drops `.` components so `./go/bin` and `go/bin` share a root.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Rejects paths with parent directory references or absolute roots.
fn reject_escaping_path(path: &Path) -> anyhow::Result<()> {
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            path.display()
        );
    }
    Ok(())
}

/// Applies the detected root prefix. `None` means the entry is the root
/// folder itself (or empty) and should be skipped.
fn strip_root(path: &Path, prefix: Option<&Path>) -> Option<PathBuf> {
    let relative = match prefix {
        Some(prefix) => path.strip_prefix(prefix).unwrap_or(path),
        None => path,
    };
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative.to_path_buf())
    }
}

/// Finds a single top-level folder shared by every entry.
///
/// Returns `Some(prefix)` only if all entries start with the same first
/// component AND at least one entry is nested below it. A lone file at the
/// archive root is therefore never mistaken for a wrapping folder.
fn common_root<I>(entries: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut common: Option<PathBuf> = None;
    let mut has_nested_entries = false;

    for path in entries {
        let mut components = path.components();
        let first = components.next()?;
        if components.next().is_some() {
            has_nested_entries = true;
        }
        let root = PathBuf::from(first.as_os_str());

        match &common {
            None => common = Some(root),
            Some(existing) if existing != &root => return None,
            Some(_) => {}
        }
    }

    if has_nested_entries { common } else { None }
}

fn find_common_root_folder_tar(archive_path: &Path) -> anyhow::Result<Option<PathBuf>> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut paths = Vec::new();
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;
        let path = normalize(&entry.path().with_context(|| "Failed to get entry path")?);
        if path.as_os_str().is_empty() {
            continue;
        }
        paths.push(path);
    }

    Ok(common_root(paths))
}

fn find_common_root_folder_zip<R: std::io::Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Option<PathBuf> {
    let mut paths = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).ok()?;
        let path = normalize(&entry.enclosed_name()?);
        if path.as_os_str().is_empty() {
            continue;
        }
        paths.push(path);
    }
    common_root(paths)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    /// Writes a tar.gz with a valid entry followed by one that escapes the
    /// destination. The tar builder refuses `..`, so the name is written raw.
    fn write_tar_gz_failing_midway(archive_path: &Path) {
        let file = std::fs::File::create(archive_path).expect("Should create file");
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(9);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "go/bin/go", b"go binary".as_slice())
            .expect("Should append file");

        let mut header = tar::Header::new_gnu();
        let name = b"../evil";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append(&header, b"evil".as_slice())
            .expect("Should append raw entry");

        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gzip");
    }

    const NO_DATA: &[u8] = &[];

    /// Entry kinds for archives built header by header.
    enum RawEntry<'a> {
        File(&'a str, &'a [u8]),
        Symlink(&'a str, &'a str),
        HardLink(&'a str, &'a str),
    }

    /// Writes a tar.gz with raw names and link targets, bypassing the
    /// builder's own path checks.
    fn write_tar_gz_raw(archive_path: &Path, entries: &[RawEntry<'_>]) {
        let file = std::fs::File::create(archive_path).expect("Should create file");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        for entry in entries {
            let (name, link, kind, data): (&str, &str, tar::EntryType, &[u8]) = match *entry {
                RawEntry::File(name, data) => (name, "", tar::EntryType::Regular, data),
                RawEntry::Symlink(name, target) => (name, target, tar::EntryType::Symlink, NO_DATA),
                RawEntry::HardLink(name, target) => (name, target, tar::EntryType::Link, NO_DATA),
            };
            let mut header = tar::Header::new_gnu();
            let old = header.as_old_mut();
            old.name[..name.len()].copy_from_slice(name.as_bytes());
            old.linkname[..link.len()].copy_from_slice(link.as_bytes());
            header.set_entry_type(kind);
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, data).expect("Should append raw entry");
        }

        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gzip");
    }

    fn staging_entries(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .filter_map(|e| e.file_name().to_str().map(str::to_string))
                    .filter(|name| name.contains(STAGING_MARKER))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn extract_tar_gz_strips_common_root_folder() {
        let temp_dir = temp_test_dir("tar_gz_strip");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");

        write_go_archive(&archive_path);
        extract_tar_gz(&archive_path, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("bin").join("go").exists());
        assert!(dest_dir.join("src").join("runtime").join("proc.go").exists());
        assert!(dest_dir.join("VERSION").exists());
        assert!(!dest_dir.join("go").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_tar_gz_preserves_structure_without_common_root() {
        let temp_dir = temp_test_dir("tar_gz_preserve");
        let archive_path = temp_dir.join("test.tar.gz");
        let dest_dir = temp_dir.join("output");

        write_tar_gz(
            &archive_path,
            &[("bin/tool", b"binary"), ("lib/libtool.so", b"library")],
        );
        extract_tar_gz(&archive_path, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("bin").join("tool").exists());
        assert!(dest_dir.join("lib").join("libtool.so").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_tar_gz_flat_single_file_not_stripped() {
        let temp_dir = temp_test_dir("tar_gz_flat");
        let archive_path = temp_dir.join("test.tar.gz");
        let dest_dir = temp_dir.join("output");

        write_tar_gz(&archive_path, &[("tool", b"binary")]);
        extract_tar_gz(&archive_path, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("tool").is_file());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_tar_gz_treats_dot_prefix_as_same_root() {
        let temp_dir = temp_test_dir("tar_gz_dot");
        let archive_path = temp_dir.join("test.tar.gz");
        let dest_dir = temp_dir.join("output");

        write_tar_gz(
            &archive_path,
            &[("./go/bin/go", b"binary"), ("./go/VERSION", b"go1.16.3")],
        );
        extract_tar_gz(&archive_path, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("bin").join("go").exists());
        assert!(dest_dir.join("VERSION").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_archive_selects_zip_and_strips_root() {
        let temp_dir = temp_test_dir("zip_strip");
        let archive_path = temp_dir.join("go.zip");
        let dest_dir = temp_dir.join("output");

        write_zip(
            &archive_path,
            &[("go/bin/go.exe", b"binary"), ("go/VERSION", b"go1.16.3")],
        );
        extract_archive(&archive_path, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("bin").join("go.exe").exists());
        assert!(dest_dir.join("VERSION").exists());
        assert!(!dest_dir.join("go").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_zip_preserves_structure_without_common_root() {
        let temp_dir = temp_test_dir("zip_preserve");
        let archive_path = temp_dir.join("test.zip");
        let dest_dir = temp_dir.join("output");

        write_zip(
            &archive_path,
            &[("bin/tool", b"binary"), ("README", b"read me")],
        );
        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("bin").join("tool").exists());
        assert!(dest_dir.join("README").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_restores_unix_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = temp_test_dir("zip_mode");
        let archive_path = temp_dir.join("tool.zip");
        let dest_dir = temp_dir.join("output");

        write_zip(&archive_path, &[("tool/bin/tool", b"binary")]);
        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        let mode = std::fs::metadata(dest_dir.join("bin").join("tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn common_root_requires_shared_nested_folder() {
        let paths = |names: &[&str]| names.iter().map(PathBuf::from).collect::<Vec<_>>();

        assert_eq!(
            common_root(paths(&["go", "go/bin/go", "go/VERSION"])),
            Some(PathBuf::from("go"))
        );
        assert_eq!(common_root(paths(&["go/bin/go", "other/file"])), None);
        assert_eq!(common_root(paths(&["a", "b"])), None);
        assert_eq!(common_root(paths(&["single"])), None);
        assert_eq!(common_root(Vec::new()), None);
    }

    #[test]
    fn install_promotes_staging_into_install_dir() {
        let root = temp_test_dir("install_ok");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("go1.16.3.linux-amd64.tar.gz");
        write_go_archive(&archive_path);

        let dir = install(&paths, "go", "1.16.3", &archive_path).expect("Should install");

        assert_eq!(dir, paths.install_dir("go", "1.16.3").unwrap());
        assert!(dir.join("bin").join("go").is_file());
        assert!(dir.join("src").join("runtime").join("proc.go").is_file());
        assert!(!dir.join("go").exists());
        assert!(staging_entries(&paths.sdk_dir("go").unwrap()).is_empty());
        assert!(!paths.current_link_path("go").unwrap().exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn install_failing_midway_leaves_no_install_dir() {
        let root = temp_test_dir("install_midway");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("broken.tar.gz");
        write_tar_gz_failing_midway(&archive_path);

        let err = install(&paths, "go", "1.16.3", &archive_path).unwrap_err();

        assert!(matches!(err, DevctlError::ExtractionFailed { .. }));
        assert!(!paths.install_dir("go", "1.16.3").unwrap().exists());
        let sdk_dir = paths.sdk_dir("go").unwrap();
        assert!(staging_entries(&sdk_dir).is_empty());
        assert!(!paths.sdks.join("evil").exists());
        assert!(!sdk_dir.join("evil").exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[cfg(unix)]
    #[test]
    fn install_rejects_symlink_to_outside_directory() {
        let root = temp_test_dir("install_symlink_escape");
        let outside = temp_test_dir("install_symlink_outside");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("go.tar.gz");
        let outside_str = outside.to_str().unwrap();
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/VERSION", b"go1.16.3"),
                RawEntry::Symlink("go/lib", outside_str),
                RawEntry::File("go/lib/pwned", b"pwned"),
            ],
        );

        let err = install(&paths, "go", "1.16.3", &archive_path).unwrap_err();

        assert!(matches!(err, DevctlError::ExtractionFailed { .. }));
        assert!(!outside.join("pwned").exists());
        assert!(!paths.install_dir("go", "1.16.3").unwrap().exists());
        assert!(staging_entries(&paths.sdk_dir("go").unwrap()).is_empty());

        let _ = std::fs::remove_dir_all(&root);
        let _ = std::fs::remove_dir_all(&outside);
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_rejects_parent_relative_symlink() {
        let temp_dir = temp_test_dir("tar_symlink_parent");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/bin/go", b"go binary"),
                RawEntry::Symlink("go/bin/up", "../../etc"),
            ],
        );

        assert!(extract_tar_gz(&archive_path, &dest_dir).is_err());
        assert!(std::fs::symlink_metadata(dest_dir.join("bin").join("up")).is_err());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_rejects_dotdot_after_descending() {
        let temp_dir = temp_test_dir("tar_symlink_descend");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/bin/go", b"go binary"),
                RawEntry::Symlink("go/bin/sneaky", "go/../../x"),
            ],
        );

        assert!(extract_tar_gz(&archive_path, &dest_dir).is_err());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_never_writes_through_a_symlink() {
        let temp_dir = temp_test_dir("tar_through_link");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/bin/go", b"go binary"),
                RawEntry::Symlink("go/lib", "bin"),
                RawEntry::File("go/lib/extra", b"extra"),
            ],
        );

        assert!(extract_tar_gz(&archive_path, &dest_dir).is_err());
        assert!(!dest_dir.join("bin").join("extra").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_gz_keeps_symlinks_inside_archive() {
        let temp_dir = temp_test_dir("tar_symlink_ok");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/bin/go", b"go binary"),
                RawEntry::Symlink("go/bin/golink", "go"),
                RawEntry::Symlink("go/lib/tool", "../bin/go"),
            ],
        );

        extract_tar_gz(&archive_path, &dest_dir).expect("Should extract");

        assert_eq!(
            std::fs::read_link(dest_dir.join("bin").join("golink")).unwrap(),
            PathBuf::from("go")
        );
        assert_eq!(
            std::fs::read(dest_dir.join("lib").join("tool")).unwrap(),
            b"go binary"
        );

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn install_recreates_hard_links_below_stripped_root() {
        let root = temp_test_dir("install_hardlink");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("go.tar.gz");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/bin/go", b"go binary"),
                RawEntry::HardLink("go/bin/go-alias", "go/bin/go"),
            ],
        );

        let dir = install(&paths, "go", "1.16.3", &archive_path).expect("Should install");

        assert_eq!(
            std::fs::read(dir.join("bin").join("go-alias")).unwrap(),
            b"go binary"
        );
        assert!(dir.join("bin").join("go").is_file());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn extract_tar_gz_rejects_hard_link_outside_archive() {
        let temp_dir = temp_test_dir("tar_hardlink_escape");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::File("go/bin/go", b"go binary"),
                RawEntry::HardLink("go/bin/passwd", "../../etc/passwd"),
            ],
        );

        assert!(extract_tar_gz(&archive_path, &dest_dir).is_err());
        assert!(!dest_dir.join("bin").join("passwd").exists());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_tar_gz_rejects_hard_link_to_missing_file() {
        let temp_dir = temp_test_dir("tar_hardlink_missing");
        let archive_path = temp_dir.join("go.tar.gz");
        let dest_dir = temp_dir.join("output");
        write_tar_gz_raw(
            &archive_path,
            &[
                RawEntry::HardLink("go/bin/alias", "go/bin/go"),
                RawEntry::File("go/bin/go", b"go binary"),
            ],
        );

        assert!(extract_tar_gz(&archive_path, &dest_dir).is_err());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_recreates_symlink_entries() {
        use std::io::Write;

        let temp_dir = temp_test_dir("zip_symlink_ok");
        let archive_path = temp_dir.join("tool.zip");
        let dest_dir = temp_dir.join("output");

        let mut zip = zip::ZipWriter::new(std::fs::File::create(&archive_path).unwrap());
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        zip.start_file("tool/bin/tool", options).unwrap();
        zip.write_all(b"binary").unwrap();
        zip.add_symlink("tool/bin/alias", "tool", options).unwrap();
        zip.finish().unwrap();

        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        let alias = dest_dir.join("bin").join("alias");
        assert!(alias.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&alias).unwrap(), PathBuf::from("tool"));
        assert_eq!(std::fs::read(&alias).unwrap(), b"binary");

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn extract_zip_rejects_symlink_to_outside_directory() {
        use std::io::Write;

        let temp_dir = temp_test_dir("zip_symlink_escape");
        let archive_path = temp_dir.join("tool.zip");
        let dest_dir = temp_dir.join("output");

        let mut zip = zip::ZipWriter::new(std::fs::File::create(&archive_path).unwrap());
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        zip.add_symlink("tool/lib", "/etc", options).unwrap();
        zip.start_file("tool/lib/pwned", options).unwrap();
        zip.write_all(b"pwned").unwrap();
        zip.finish().unwrap();

        assert!(extract_zip(&archive_path, &dest_dir).is_err());
        assert!(std::fs::symlink_metadata(dest_dir.join("lib")).is_err());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn symlink_targets_must_stay_below_root() {
        let ok = |link: &str, target: &str| {
            check_symlink_target(Path::new(link), Path::new(target)).is_ok()
        };

        assert!(ok("bin/go", "gofmt"));
        assert!(ok("lib/tool", "../bin/go"));
        assert!(ok("a/b/c", "../../x/y"));
        assert!(!ok("bin/up", "../../etc"));
        assert!(!ok("top", ".."));
        assert!(!ok("bin/go", "/usr/bin/go"));
        assert!(!ok("bin/go", "x/../../y"));
        assert!(!ok("bin/go", ""));
        assert!(is_symlink_mode(0o120_777));
        assert!(!is_symlink_mode(0o100_755));
    }

    #[test]
    fn install_corrupt_archive_reports_extraction_failed() {
        let root = temp_test_dir("install_corrupt");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("corrupt.tar.gz");
        std::fs::write(&archive_path, b"this is not gzip").unwrap();

        let err = install(&paths, "go", "1.16.3", &archive_path).unwrap_err();

        match err {
            DevctlError::ExtractionFailed {
                sdk,
                version,
                archive,
                ..
            } => {
                assert_eq!(sdk, "go");
                assert_eq!(version, "1.16.3");
                assert_eq!(archive, archive_path);
            }
            other => panic!("Expected ExtractionFailed, got {other:?}"),
        }
        assert!(!paths.install_dir("go", "1.16.3").unwrap().exists());
        assert!(staging_entries(&paths.sdk_dir("go").unwrap()).is_empty());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn install_retry_after_failure_succeeds() {
        let root = temp_test_dir("install_retry");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("go.tar.gz");
        std::fs::write(&archive_path, b"truncated").unwrap();
        assert!(install(&paths, "go", "1.16.3", &archive_path).is_err());

        write_go_archive(&archive_path);
        let dir = install(&paths, "go", "1.16.3", &archive_path).expect("Retry should succeed");
        assert!(dir.join("bin").join("go").is_file());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn install_rejects_empty_archive() {
        let root = temp_test_dir("install_empty");
        let paths = SdkPaths::with_root(root.clone());
        let archive_path = root.join("empty.tar.gz");
        write_tar_gz(&archive_path, &[]);

        let err = install(&paths, "go", "1.16.3", &archive_path).unwrap_err();

        assert!(matches!(err, DevctlError::ExtractionFailed { .. }));
        assert!(!paths.install_dir("go", "1.16.3").unwrap().exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn install_over_existing_version_fails_without_touching_it() {
        let root = temp_test_dir("install_existing");
        let paths = SdkPaths::with_root(root.clone());
        let existing = paths.install_dir("go", "1.16.3").unwrap();
        std::fs::create_dir_all(existing.join("bin")).unwrap();
        std::fs::write(existing.join("bin").join("go"), b"original").unwrap();
        let archive_path = root.join("go.tar.gz");
        write_go_archive(&archive_path);

        let err = install(&paths, "go", "1.16.3", &archive_path).unwrap_err();

        assert!(matches!(err, DevctlError::PromotionFailed { .. }));
        assert_eq!(
            std::fs::read(existing.join("bin").join("go")).unwrap(),
            b"original"
        );
        assert!(staging_entries(&paths.sdk_dir("go").unwrap()).is_empty());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn copy_dir_all_copies_nested_tree() {
        let temp_dir = temp_test_dir("copy_tree");
        let src = temp_dir.join("src");
        std::fs::create_dir_all(src.join("bin")).unwrap();
        std::fs::write(src.join("bin").join("go"), b"binary").unwrap();
        std::fs::write(src.join("VERSION"), b"1").unwrap();

        let dst = temp_dir.join("dst");
        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(std::fs::read(dst.join("bin").join("go")).unwrap(), b"binary");
        assert!(dst.join("VERSION").is_file());

        let _ = std::fs::remove_dir_all(&temp_dir);
    }
}
