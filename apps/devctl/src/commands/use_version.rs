//! Use command.
//!
//! Installs a version if it is missing, then points `sdks/<SDK>/current` at
//! it. This is the main entry point for day-to-day use.
//!
//! ## Usage
//!
//! ```bash
//! devctl go use 1.16.3
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::CliLifecycle;
use crate::sdk::SwitchOutcome;

/// Arguments for the use command.
#[derive(Args)]
pub struct UseArgs {
    /// Version to use (e.g., "1.16.3").
    pub version: String,

    /// Expected SHA-256 of the archive, checked if a download is needed.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

/// Executes the use command.
///
/// # Errors
///
/// Returns an error if installing or switching fails.
pub async fn execute(sdk: &str, args: &UseArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let version = &args.version;

    let used = lifecycle
        .use_version(sdk, version, args.sha256.as_deref())
        .await
        .with_context(|| format!("Failed to use {sdk} {version}"))?;

    if used.installed.fresh {
        println!("Installed {sdk} {version}.");
    }
    match used.switch {
        SwitchOutcome::Unchanged => println!("{sdk} {version} is already the current version."),
        _ => println!("Now using {sdk} {version}."),
    }
    Ok(())
}
