//! Sdks command: lists the SDK plugins devctl can manage.
//!
//! ## Output Format
//!
//! ```text
//! Available sdks:
//!   go       Go toolchain (dl.google.com)      current: 1.16.3
//!   scala    Scala 3 distribution (...)
//! ```

use anyhow::Result;

use super::CliLifecycle;
use crate::sdk::linker;

/// Executes the sdks command.
///
/// # Errors
///
/// Returns an error if an SDK's `current` link cannot be examined.
pub fn execute(lifecycle: &CliLifecycle) -> Result<()> {
    println!("Available sdks:");
    for plugin in lifecycle.registry().iter() {
        let name = plugin.name();
        let current = linker::current_version(lifecycle.paths(), name)?;
        match current {
            Some(version) => println!(
                "  {name:<8} {:<45} current: {version}",
                plugin.description()
            ),
            None => println!("  {name:<8} {}", plugin.description()),
        }
    }
    Ok(())
}
