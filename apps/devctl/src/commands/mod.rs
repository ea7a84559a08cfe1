//! Command modules for the devctl CLI.
//!
//! Per-SDK commands (`devctl <SDK> <ACTION>`):
//!
//! - [`download`] - Fetch an archive into the download cache
//! - [`install`] - Download and extract a version
//! - [`use_version`] - Install if needed, then make a version current
//! - [`link`] - Make an installed version current
//! - [`list`] - List installed versions
//! - [`current`] - Show the current version
//! - [`uninstall`] - Remove an installed version
//! - [`clean`] - Remove dangling links and leftovers of interrupted runs
//!
//! Global commands:
//!
//! - [`sdks`] - List available SDK plugins
//! - [`hook`] - Print a shell snippet exporting active SDKs

pub mod clean;
pub mod current;
pub mod download;
pub mod hook;
pub mod install;
pub mod link;
pub mod list;
pub mod sdks;
pub mod uninstall;
pub mod use_version;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::{ConfigStore, YamlConfigStore};
use crate::sdk::{HttpDownloader, Lifecycle, Platform, Registry, SdkPaths};

/// Lifecycle wired to the real downloader and config file.
pub type CliLifecycle = Lifecycle<HttpDownloader, YamlConfigStore>;

/// Actions available under `devctl <SDK>`.
#[derive(Parser)]
#[command(
    about = "Manage versions of one SDK",
    disable_version_flag = true,
    subcommand_required = true
)]
pub struct SdkCli {
    #[command(subcommand)]
    pub action: SdkAction,
}

#[derive(Subcommand)]
pub enum SdkAction {
    /// Download a version's archive into the cache without installing it.
    Download(download::DownloadArgs),

    /// Download and extract a version without making it current.
    Install(install::InstallArgs),

    /// Install a version if needed and make it current.
    Use(use_version::UseArgs),

    /// Make an already installed version current.
    Link(link::LinkArgs),

    /// List installed versions, marking the current one.
    List,

    /// Show the current version.
    Current,

    /// Remove an installed version.
    Uninstall(uninstall::UninstallArgs),

    /// Remove dangling symlinks and leftovers of interrupted installs.
    Clean(clean::CleanArgs),
}

/// Parses `devctl <SDK> ...` arguments and runs the action.
///
/// `args[0]` is the SDK name. Usage errors exit the process the way clap
/// does for the top-level parser.
///
/// # Errors
///
/// Returns an error if the action fails.
pub async fn run_sdk(args: &[String], lifecycle: &CliLifecycle) -> Result<()> {
    let Some(sdk) = args.first() else {
        anyhow::bail!("missing SDK name");
    };
    let cli = SdkCli::parse_from(args);

    match cli.action {
        SdkAction::Download(args) => download::execute(sdk, &args, lifecycle).await,
        SdkAction::Install(args) => install::execute(sdk, &args, lifecycle).await,
        SdkAction::Use(args) => use_version::execute(sdk, &args, lifecycle).await,
        SdkAction::Link(args) => link::execute(sdk, &args, lifecycle),
        SdkAction::List => list::execute(sdk, lifecycle),
        SdkAction::Current => current::execute(sdk, lifecycle),
        SdkAction::Uninstall(args) => uninstall::execute(sdk, &args, lifecycle),
        SdkAction::Clean(args) => clean::execute(sdk, &args, lifecycle),
    }
}

/// Builds the lifecycle for a root directory.
///
/// Plugins declared in `config.yaml` are added to the built-in ones. An
/// unreadable config only loses those plugins; it does not stop commands
/// that work from disk state alone.
///
/// # Errors
///
/// Returns an error if the host platform is unsupported.
pub fn lifecycle(paths: SdkPaths, show_progress: bool) -> Result<CliLifecycle> {
    let store = YamlConfigStore::new(paths.config_path());
    let registry = match store.load() {
        Ok(config) => Registry::from_config(&config)
            .with_context(|| format!("Invalid plugin in {}", store.path().display()))?,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable config; only built-in sdks are available");
            Registry::builtin()
        }
    };
    let platform = Platform::detect().context("Cannot determine download platform")?;

    Ok(Lifecycle::new(
        paths,
        registry,
        HttpDownloader::new(show_progress),
        store,
        platform,
    ))
}
