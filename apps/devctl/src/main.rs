#![warn(clippy::pedantic)]

//! # devctl
//!
//! A developer environment bootstrapper. `devctl` downloads SDK archives,
//! extracts each version into its own directory, and keeps a `current`
//! symlink per SDK pointing at the active version:
//!
//! ```text
//! ~/.devctl/sdks/go/1.15/
//! ~/.devctl/sdks/go/1.16.3/
//! ~/.devctl/sdks/go/current -> ~/.devctl/sdks/go/1.16.3
//! ```
//!
//! ## Subcommands
//!
//! - `<SDK> download|install|use|link|list|current|uninstall|clean`
//! - `sdks` - List available SDK plugins
//! - `hook` - Print a shell snippet exporting active SDKs
//!
//! ## Examples
//!
//! Install Go 1.16.3 and make it current:
//! ```bash
//! devctl go use 1.16.3
//! ```
//!
//! Put active SDKs on `PATH`:
//! ```bash
//! eval "$(devctl hook bash)"
//! ```

mod commands;
mod config;
mod errors;
mod sdk;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use commands::{hook, sdks};
use sdk::SdkPaths;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "DEVCTL_LOG";

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("DEVCTL_GIT_COMMIT"),
    ")"
);

/// Developer environment bootstrapper.
#[derive(Parser)]
#[command(
    name = "devctl",
    author,
    version,
    long_version = LONG_VERSION,
    about = "Install SDK versions side by side and switch between them",
    after_help = "\
SDK ACTIONS:
    devctl <SDK> download <VERSION> [--sha256 HEX]
    devctl <SDK> install <VERSION> [--sha256 HEX]
    devctl <SDK> use <VERSION> [--sha256 HEX]
    devctl <SDK> link <VERSION>
    devctl <SDK> list
    devctl <SDK> current
    devctl <SDK> uninstall <VERSION>
    devctl <SDK> clean [--older-than MINUTES]

ENVIRONMENT VARIABLES:
    DEVCTL_HOME     Root directory (default: ~/.devctl)
    DEVCTL_LOG      Log filter, e.g. 'debug' (overrides -v/-q)"
)]
pub struct Cli {
    /// Root directory for SDKs, downloads, and config.
    #[arg(long, global = true, env = "DEVCTL_HOME", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors and hide download progress.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available SDK plugins.
    Sdks,

    /// Print a shell snippet that puts active SDKs on PATH.
    Hook(hook::HookArgs),

    /// Manage one SDK: `devctl <SDK> <ACTION>`.
    #[command(external_subcommand)]
    Sdk(Vec<String>),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("Interrupted")),
    };

    if let Err(e) = result {
        std::process::exit(handle_error(&e));
    }
}

/// Prints an error and returns the process exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => SdkPaths::new()?.root,
    };
    let root = std::path::absolute(&root)
        .with_context(|| format!("Invalid root directory: {}", root.display()))?;
    let lifecycle = commands::lifecycle(SdkPaths::with_root(root), !cli.quiet)?;

    match cli.command {
        Commands::Sdks => sdks::execute(&lifecycle),
        Commands::Hook(args) => hook::execute(&args, &lifecycle),
        Commands::Sdk(args) => commands::run_sdk(&args, &lifecycle).await,
    }
}
