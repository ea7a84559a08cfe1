//! Uninstall command.
//!
//! Removes an installed version. The current version cannot be removed;
//! switch to another version first. Cached downloads are kept.
//!
//! ## Usage
//!
//! ```bash
//! devctl go uninstall 1.15
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::CliLifecycle;

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Version to uninstall (e.g., "1.15").
    pub version: String,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if the version is not installed, is current, or cannot
/// be removed.
pub fn execute(sdk: &str, args: &UninstallArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let version = &args.version;
    println!("Uninstalling {sdk} {version}...");

    let dir = lifecycle
        .uninstall(sdk, version)
        .with_context(|| format!("Failed to uninstall {sdk} {version}"))?;

    println!("Removed {}", dir.display());
    Ok(())
}
