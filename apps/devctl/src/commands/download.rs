//! Download command.
//!
//! Fetches a version's archive into the download cache without extracting
//! it. A cached archive is reused.
//!
//! ## Usage
//!
//! ```bash
//! devctl go download 1.16.3
//! devctl go download 1.16.3 --sha256 <hex>
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::CliLifecycle;

/// Arguments for the download command.
#[derive(Args)]
pub struct DownloadArgs {
    /// Version to download (e.g., "1.16.3").
    pub version: String,

    /// Expected SHA-256 of the archive.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,
}

/// Executes the download command.
///
/// # Errors
///
/// Returns an error if the SDK is unknown, the transfer fails, or the
/// checksum does not match.
pub async fn execute(sdk: &str, args: &DownloadArgs, lifecycle: &CliLifecycle) -> Result<()> {
    let version = &args.version;
    println!("Downloading {sdk} {version}...");

    let artifact = lifecycle
        .download(sdk, version, args.sha256.as_deref())
        .await
        .with_context(|| format!("Failed to download {sdk} {version}"))?;

    println!("Saved to {}", artifact.display());
    Ok(())
}
