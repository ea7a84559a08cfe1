//! Error types for devctl.
//!
//! The SDK core (`sdk::*`) returns [`DevctlError`] so callers can react to
//! specific failure kinds (a missing install, an occupied `current` entry).
//! Command handlers wrap these in `anyhow` with additional context.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the SDK core.
pub type Result<T, E = DevctlError> = std::result::Result<T, E>;

/// Consolidated error type for SDK operations.
#[derive(Debug, Error)]
pub enum DevctlError {
    /// An sdk name, version, or file name is unsafe to use as a path segment.
    #[error("invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        /// What the identifier names ("sdk", "version", "file name").
        kind: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A switch was requested for a version that has no install directory.
    #[error("{sdk} {version} is not installed")]
    VersionNotInstalled {
        /// The SDK name.
        sdk: String,
        /// The requested version.
        version: String,
    },

    /// The `current` entry exists but is a real file or directory.
    #[error(
        "{} exists but is not a symlink; refusing to replace it.\n\
         Inspect it and remove it manually, then run the command again.",
        path.display()
    )]
    CurrentIsNotASymlink {
        /// Location of the offending entry.
        path: PathBuf,
    },

    /// Extracting an archive failed; the staging directory has been removed.
    #[error("failed to extract {} for {sdk} {version}", archive.display())]
    ExtractionFailed {
        /// The SDK name.
        sdk: String,
        /// The version being installed.
        version: String,
        /// The archive that could not be extracted.
        archive: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Renaming a finished staging directory into place failed.
    ///
    /// Usually means another process installed the same version first.
    /// Re-running the command is safe.
    #[error("failed to move {} into place at {}", staging.display(), target.display())]
    PromotionFailed {
        /// The staging directory.
        staging: PathBuf,
        /// The final install directory.
        target: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Fetching an artifact failed.
    #[error("download of {url} failed")]
    DownloadFailed {
        /// The remote URI.
        url: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Checksum verification failed.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        /// The file that was verified.
        path: PathBuf,
        /// The expected checksum.
        expected: String,
        /// The actual checksum.
        actual: String,
    },

    /// No plugin is registered under this name.
    #[error("unknown sdk '{sdk}'; run 'devctl sdks' to see available sdks")]
    UnknownSdk {
        /// The requested SDK name.
        sdk: String,
    },

    /// The current OS/architecture has no vendor naming.
    #[error("unsupported platform: {os} on {arch}")]
    UnsupportedPlatform {
        /// The host OS.
        os: &'static str,
        /// The host architecture.
        arch: &'static str,
    },

    /// An installed version cannot be removed while `current` points at it.
    #[error("{sdk} {version} is the current version; switch to another version first")]
    VersionInUse {
        /// The SDK name.
        sdk: String,
        /// The version.
        version: String,
    },

    /// The configuration file could not be read or written.
    #[error("config error in {}: {message}", path.display())]
    Config {
        /// The config file path.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Error reading or writing files.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DevctlError {
    /// Creates a new `InvalidIdentifier` error.
    #[must_use]
    pub fn invalid_identifier(
        kind: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidIdentifier {
            kind,
            value: value.into(),
            reason,
        }
    }

    /// Creates a new `VersionNotInstalled` error.
    #[must_use]
    pub fn version_not_installed(sdk: impl Into<String>, version: impl Into<String>) -> Self {
        Self::VersionNotInstalled {
            sdk: sdk.into(),
            version: version.into(),
        }
    }

    /// Creates a new `CurrentIsNotASymlink` error.
    #[must_use]
    pub fn current_is_not_a_symlink(path: impl Into<PathBuf>) -> Self {
        Self::CurrentIsNotASymlink { path: path.into() }
    }

    /// Creates a new `ExtractionFailed` error.
    #[must_use]
    pub fn extraction_failed(
        sdk: impl Into<String>,
        version: impl Into<String>,
        archive: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ExtractionFailed {
            sdk: sdk.into(),
            version: version.into(),
            archive: archive.into(),
            source: source.into(),
        }
    }

    /// Creates a new `DownloadFailed` error.
    #[must_use]
    pub fn download_failed(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `UnknownSdk` error.
    #[must_use]
    pub fn unknown_sdk(sdk: impl Into<String>) -> Self {
        Self::UnknownSdk { sdk: sdk.into() }
    }

    /// Creates a new `VersionInUse` error.
    #[must_use]
    pub fn version_in_use(sdk: impl Into<String>, version: impl Into<String>) -> Self {
        Self::VersionInUse {
            sdk: sdk.into(),
            version: version.into(),
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

/// Attaches a message to I/O results, producing [`DevctlError::Io`].
pub trait IoContext<T> {
    /// Wraps the error with a lazily built message.
    fn io_context<F, S>(self, message: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F, S>(self, message: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| DevctlError::io(message(), source))
    }
}
