//! Current command: reports what `sdks/<SDK>/current` points at.

use anyhow::Result;

use super::CliLifecycle;
use crate::errors::DevctlError;
use crate::sdk::LinkState;

/// Executes the current command.
///
/// # Errors
///
/// Returns an error if `current` cannot be examined or is occupied by
/// something other than a symlink.
pub fn execute(sdk: &str, lifecycle: &CliLifecycle) -> Result<()> {
    match lifecycle.current(sdk)? {
        LinkState::Resolving { points_to } => {
            let version = points_to.file_name().unwrap_or(points_to.as_os_str());
            println!("{}", version.to_string_lossy());
        }
        LinkState::Missing => {
            println!("No current {sdk} version.");
        }
        LinkState::Dangling { points_to } => {
            println!(
                "The current {sdk} link points at {}, which no longer exists.",
                points_to.display()
            );
            println!("Run 'devctl {sdk} link <VERSION>' or 'devctl {sdk} clean'.");
        }
        LinkState::Occupied { .. } => {
            let path = lifecycle.paths().current_link_path(sdk)?;
            return Err(DevctlError::current_is_not_a_symlink(path).into());
        }
    }
    Ok(())
}
