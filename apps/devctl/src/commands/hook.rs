//! Hook command.
//!
//! Prints a shell snippet that exports every SDK with a current version.
//!
//! ## Usage
//!
//! ```bash
//! eval "$(devctl hook bash)"          # ~/.bashrc
//! eval "$(devctl hook zsh)"           # ~/.zshrc
//! devctl hook fish | source           # ~/.config/fish/config.fish
//! ```

use anyhow::{Result, bail};
use clap::Args;

use super::CliLifecycle;
use crate::sdk::shell::{self, Shell};

/// Arguments for the hook command.
#[derive(Args)]
pub struct HookArgs {
    /// Shell to generate the hook for. Detected from `$SHELL` if omitted.
    #[arg(value_enum)]
    pub shell: Option<Shell>,
}

/// Executes the hook command.
///
/// # Errors
///
/// Returns an error if the shell cannot be determined or an SDK's link
/// cannot be examined.
pub fn execute(args: &HookArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let Some(shell) = args.shell.or_else(Shell::detect) else {
        bail!("Cannot detect shell from $SHELL; pass one of: bash, zsh, fish");
    };

    let entries = shell::collect_entries(lifecycle.paths(), lifecycle.registry())?;
    print!("{}", shell.render(&entries));
    Ok(())
}
