//! Platform detection for SDK downloads.
//!
//! SDK vendors name their archives after the target OS and CPU architecture
//! (`go1.16.3.linux-amd64.tar.gz`). This module maps the compile-time target
//! onto that naming scheme.
//!
//! ## Supported Platforms
//!
//! - OS: `linux`, `darwin`, `windows`
//! - Architecture: `amd64`, `arm64`, `386`

use std::fmt;

use crate::errors::{DevctlError, Result};

/// Operating system of the host, in vendor spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

/// CPU architecture of the host, in vendor spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    X86,
}

/// The host platform an SDK archive must be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detects the current platform based on compile-time configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::UnsupportedPlatform`] if the OS or
    /// architecture has no vendor naming.
    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Builds a platform from Rust's `std::env::consts` spellings.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::UnsupportedPlatform`] for unknown values.
    pub fn from_parts(os: &'static str, arch: &'static str) -> Result<Self> {
        let unsupported = || DevctlError::UnsupportedPlatform { os, arch };
        let os_kind = match os {
            "linux" => Os::Linux,
            "macos" => Os::Darwin,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" => Arch::Amd64,
            "aarch64" => Arch::Arm64,
            "x86" => Arch::X86,
            _ => return Err(unsupported()),
        };
        Ok(Self {
            os: os_kind,
            arch: arch_kind,
        })
    }

    /// Returns the OS name used in vendor archive names.
    #[must_use = "returns the OS string without side effects"]
    pub fn os_str(self) -> &'static str {
        match self.os {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
        }
    }

    /// Returns the architecture name used in vendor archive names.
    #[must_use = "returns the arch string without side effects"]
    pub fn arch_str(self) -> &'static str {
        match self.arch {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::X86 => "386",
        }
    }

    /// Returns the archive extension vendors publish for this platform.
    ///
    /// Windows builds ship as `.zip`, everything else as `.tar.gz`.
    #[must_use = "returns the extension string without side effects"]
    pub fn archive_extension(self) -> &'static str {
        match self.os {
            Os::Windows => "zip",
            Os::Linux | Os::Darwin => "tar.gz",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os_str(), self.arch_str())
    }
}
