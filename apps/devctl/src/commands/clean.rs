//! Clean command.
//!
//! Removes dangling symlinks under `sdks/<SDK>/` and the staging
//! directories and temporary links left behind by interrupted runs.
//! Installed versions are never touched.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use super::CliLifecycle;

/// Arguments for the clean command.
#[derive(Args)]
pub struct CleanArgs {
    /// Only remove leftovers older than this many minutes.
    #[arg(long, value_name = "MINUTES", default_value_t = 60)]
    pub older_than: u64,
}

/// Executes the clean command.
///
/// # Errors
///
/// Returns an error if the SDK directory cannot be read or an entry cannot
/// be removed.
pub fn execute(sdk: &str, args: &CleanArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let report = lifecycle
        .clean(sdk, Duration::from_secs(args.older_than.saturating_mul(60)))
        .with_context(|| format!("Failed to clean {sdk}"))?;

    if report.is_empty() {
        println!("Nothing to clean for {sdk}.");
        return Ok(());
    }

    for link in &report.broken_links {
        println!("Removed dangling link {}", link.display());
    }
    for leftover in &report.leftovers {
        println!("Removed leftover {}", leftover.display());
    }
    Ok(())
}
