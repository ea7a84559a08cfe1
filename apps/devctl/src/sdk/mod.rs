//! SDK installation and version management.
//!
//! This module provides the core of devctl:
//! - Path resolution and identifier validation for the on-disk layout
//! - Staged archive extraction ([`archive`])
//! - The per-SDK `current` link ([`linker`])
//! - Downloading and checksum verification
//! - SDK plugins ([`registry`]) and shell hooks ([`shell`])
//! - End-to-end orchestration ([`Lifecycle`])

pub mod archive;
pub mod download;
pub mod lifecycle;
pub mod linker;
pub mod paths;
pub mod platform;
pub mod registry;
pub mod shell;
pub mod verify;

pub use download::HttpDownloader;
pub use lifecycle::Lifecycle;
pub use linker::{LinkState, SwitchOutcome};
pub use paths::SdkPaths;
pub use platform::Platform;
pub use registry::Registry;
