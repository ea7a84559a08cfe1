//! Install command.
//!
//! Downloads (if not cached) and extracts a version. The current version is
//! left unchanged; use `devctl <SDK> link` or `use` to switch.
//!
//! ## Usage
//!
//! ```bash
//! devctl go install 1.16.3
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::CliLifecycle;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Version to install (e.g., "1.16.3").
    pub version: String,

    /// Expected SHA-256 of the archive.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the download, verification, or extraction fails.
pub async fn execute(sdk: &str, args: &InstallArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let version = &args.version;

    let installed = lifecycle
        .install(sdk, version, args.sha256.as_deref())
        .await
        .with_context(|| format!("Failed to install {sdk} {version}"))?;

    if installed.fresh {
        println!("Installed {sdk} {version} to {}", installed.dir.display());
    } else {
        println!("{sdk} {version} is already installed.");
    }
    println!();
    println!("Run 'devctl {sdk} link {version}' to make it the current version.");
    Ok(())
}
