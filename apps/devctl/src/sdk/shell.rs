//! Shell hook generation.
//!
//! `devctl hook <shell>` prints a snippet that puts every active SDK on
//! `PATH` and exports its home variables. The snippet refers to the stable
//! `current` links, never to a version directory, so switching versions
//! does not require re-sourcing it.
//!
//! For bash/zsh:
//! ```bash
//! # devctl: go
//! export GOROOT="$HOME/.devctl/sdks/go/current"
//! export PATH="$HOME/.devctl/sdks/go/current/bin:$PATH"
//! ```
//!
//! For fish:
//! ```fish
//! # devctl: go
//! set -gx GOROOT $HOME/.devctl/sdks/go/current
//! set -gx PATH $HOME/.devctl/sdks/go/current/bin $PATH
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::sdk::linker::{self, LinkState};
use crate::sdk::paths::SdkPaths;
use crate::sdk::registry::Registry;

/// Supported shells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

impl Shell {
    /// Detects the user's shell from the `SHELL` environment variable.
    #[must_use]
    pub fn detect() -> Option<Self> {
        let shell_path = std::env::var("SHELL").ok()?;
        Self::from_path(&shell_path)
    }

    /// Parses a shell from a path string (e.g., "/bin/bash").
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let shell_name = Path::new(path).file_name()?.to_str()?;
        match shell_name {
            "bash" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }

    /// Renders the hook for `entries`.
    #[must_use]
    pub fn render(self, entries: &[HookEntry]) -> String {
        let mut out = String::new();
        for entry in entries {
            out.push_str(&format!("# devctl: {}\n", entry.sdk));
            for (name, value) in &entry.exports {
                out.push_str(&self.export_line(name, value));
            }
            for dir in entry.path_dirs.iter().rev() {
                out.push_str(&self.prepend_path_line(dir));
            }
        }
        out
    }

    fn export_line(self, name: &str, value: &Path) -> String {
        match self {
            Self::Bash | Self::Zsh => format!("export {name}=\"{}\"\n", posix_quote(value)),
            Self::Fish => format!("set -gx {name} {}\n", fish_quote(value)),
        }
    }

    fn prepend_path_line(self, dir: &Path) -> String {
        match self {
            Self::Bash | Self::Zsh => format!("export PATH=\"{}:$PATH\"\n", posix_quote(dir)),
            Self::Fish => format!("set -gx PATH {} $PATH\n", fish_quote(dir)),
        }
    }
}

/// Environment contributed by one SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEntry {
    /// SDK name.
    pub sdk: String,
    /// Variables to export.
    pub exports: Vec<(String, PathBuf)>,
    /// Directories to prepend to `PATH`, highest priority first.
    pub path_dirs: Vec<PathBuf>,
}

/// Builds hook entries for every registered SDK whose `current` link
/// resolves. SDKs with no link, a dangling link, or a non-link `current`
/// are skipped.
///
/// # Errors
///
/// Returns an error if a `current` path cannot be examined.
pub fn collect_entries(paths: &SdkPaths, registry: &Registry) -> Result<Vec<HookEntry>> {
    let mut entries = Vec::new();
    for plugin in registry.iter() {
        let sdk = plugin.name();
        match linker::current_state(paths, sdk)? {
            LinkState::Resolving { .. } => {}
            state => {
                debug!(sdk, ?state, "skipping sdk without a usable current link");
                continue;
            }
        }

        let link = paths.current_link_path(sdk)?;
        let mut exports = Vec::new();
        for (name, relative) in plugin.env() {
            if !is_valid_env_name(&name) {
                warn!(sdk, name, "ignoring invalid environment variable name");
                continue;
            }
            exports.push((name, join_relative(&link, &relative)));
        }
        let path_dirs = plugin
            .bin_dirs()
            .iter()
            .map(|dir| join_relative(&link, dir))
            .collect();

        entries.push(HookEntry {
            sdk: sdk.to_string(),
            exports,
            path_dirs,
        });
    }
    Ok(entries)
}

fn join_relative(link: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() || relative == "." {
        link.to_path_buf()
    } else {
        link.join(relative)
    }
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escapes a path for use inside double quotes in bash/zsh.
fn posix_quote(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('`', "\\`")
        .replace('"', "\\\"")
}

/// Quotes a path for fish when it contains special characters.
fn fish_quote(path: &Path) -> String {
    let path_str = path.display().to_string();
    let needs_quotes = path_str.contains([
        ' ', '$', '\\', '\'', '*', '?', '(', ')', '[', ']', '{', '}', ';', '&', '|', '#', '"',
    ]);
    if needs_quotes {
        format!(
            "'{}'",
            path_str.replace('\\', "\\\\").replace('\'', "\\'")
        )
    } else {
        path_str
    }
}
