//! Link command.
//!
//! Points `sdks/<SDK>/current` at a version that is already installed.
//! Nothing is downloaded.
//!
//! ## Usage
//!
//! ```bash
//! devctl go link 1.15
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::CliLifecycle;
use crate::sdk::SwitchOutcome;

/// Arguments for the link command.
#[derive(Args)]
pub struct LinkArgs {
    /// Installed version to make current.
    pub version: String,
}

/// Executes the link command.
///
/// # Errors
///
/// Returns an error if the version is not installed or `current` is not a
/// symlink.
pub fn execute(sdk: &str, args: &LinkArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let version = &args.version;

    let outcome = lifecycle
        .switch(sdk, version)
        .with_context(|| format!("Failed to switch {sdk} to {version}"))?;

    match outcome {
        SwitchOutcome::Unchanged => println!("{sdk} {version} is already the current version."),
        SwitchOutcome::Repaired { previous } => println!(
            "Now using {sdk} {version} (replaced dangling link to {}).",
            previous.display()
        ),
        SwitchOutcome::Created | SwitchOutcome::Replaced { .. } => {
            println!("Now using {sdk} {version}.");
        }
    }
    Ok(())
}
