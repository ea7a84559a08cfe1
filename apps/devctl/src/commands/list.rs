//! List command.
//!
//! ## Output Format
//!
//! ```text
//! Installed go versions:
//!   1.15
//! * 1.16.3
//! ```

use anyhow::Result;

use super::CliLifecycle;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the SDK directory cannot be read.
pub fn execute(sdk: &str, lifecycle: &CliLifecycle) -> Result<()> {
    let versions = lifecycle.list(sdk)?;

    if versions.is_empty() {
        println!("No {sdk} versions installed.");
        println!();
        println!("Run 'devctl {sdk} use <VERSION>' to install one.");
        return Ok(());
    }

    println!("Installed {sdk} versions:");
    for installed in &versions {
        let marker = if installed.current { "*" } else { " " };
        println!("{marker} {}", installed.version);
    }

    if !versions.iter().any(|v| v.current) {
        println!();
        println!("No current version. Run 'devctl {sdk} link <VERSION>' to set one.");
    }
    Ok(())
}
