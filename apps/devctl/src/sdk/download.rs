//! Fetching SDK archives.
//!
//! The lifecycle only depends on the [`Downloader`] trait; [`HttpDownloader`]
//! is the implementation used by the CLI.
//!
//! ## Features
//!
//! - Streaming downloads with a text progress line
//! - Automatic retry with exponential backoff (3 attempts)
//! - Downloads to `<dest>.part`, then renames on success, so an interrupted
//!   transfer never looks like a cached artifact
//! - `file://` URLs are copied locally (offline mirrors)

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use futures_util::StreamExt;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::{DevctlError, Result};

/// Fetches a remote artifact to a local path.
pub trait Downloader {
    /// Downloads `url` to `dest`, creating parent directories as needed.
    ///
    /// On success `dest` holds the complete artifact. On failure `dest` is
    /// left untouched.
    fn download(&self, url: &str, dest: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Maximum number of download attempts.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// HTTP(S) and `file://` downloader backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    show_progress: bool,
}

impl HttpDownloader {
    /// Creates a downloader; `show_progress` enables the progress line.
    #[must_use]
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        download_file(url, dest, self.show_progress)
            .await
            .map_err(|e| DevctlError::download_failed(url, e))
    }
}

/// Downloads `url` to `dest`, retrying transient failures.
///
/// # Errors
///
/// Returns an error if:
/// - The URL cannot be parsed or uses an unsupported scheme
/// - The network request fails after all retries
/// - The destination file cannot be created or renamed
pub async fn download_file(url: &str, dest: &Path, show_progress: bool) -> anyhow::Result<()> {
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
    let temp_path = part_path(dest);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    match parsed.scheme() {
        "file" => {
            let source = parsed
                .to_file_path()
                .map_err(|()| anyhow::anyhow!("Invalid file URL: {url}"))?;
            copy_local(&source, &temp_path).await?;
            return finish(&temp_path, dest).await;
        }
        "http" | "https" => {}
        other => bail!("Unsupported URL scheme '{other}': {url}"),
    }

    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = calculate_retry_delay(attempt);
            warn!(
                url,
                attempt = attempt + 1,
                max = MAX_RETRIES,
                delay_ms = delay,
                "retrying download"
            );
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        match download_with_progress(url, &temp_path, show_progress).await {
            Ok(()) => return finish(&temp_path, dest).await,
            Err(e) => {
                debug!(url, error = %e, "download attempt failed");
                last_error = Some(e);
                let _ = tokio::fs::remove_file(&temp_path).await;
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| anyhow::anyhow!("Download failed after {MAX_RETRIES} attempts")))
}

/// Returns the in-progress path for `dest`: `<dest>.part`.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn finish(temp_path: &Path, dest: &Path) -> anyhow::Result<()> {
    tokio::fs::rename(temp_path, dest).await.with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            dest.display()
        )
    })
}

async fn copy_local(source: &Path, temp_path: &Path) -> anyhow::Result<()> {
    debug!(source = %source.display(), "copying local artifact");
    if let Err(e) = tokio::fs::copy(source, temp_path).await {
        let _ = tokio::fs::remove_file(temp_path).await;
        return Err(e).with_context(|| format!("Failed to copy {}", source.display()));
    }
    Ok(())
}

/// Downloads a file with a text progress line on stdout.
async fn download_with_progress(url: &str, dest: &Path, show_progress: bool) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    if !response.status().is_success() {
        bail!("HTTP error {}: {url}", response.status());
    }

    let total_size = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read chunk from {url}"))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", dest.display()))?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if show_progress && now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
            print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            last_update = now;
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    if show_progress {
        print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
        println!();
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn print_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };

    print!(
        "\r{}/{} ({percent}%) {}     ",
        format_bytes(downloaded),
        format_bytes(total),
        format_speed(speed)
    );
    let _ = std::io::stdout().flush();
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

/// Calculates the retry delay with exponential backoff and jitter.
///
/// The delay doubles with each attempt (1s, 2s, 4s) with +/- 25% jitter.
fn calculate_retry_delay(attempt: u32) -> u64 {
    let base_delay = BASE_RETRY_DELAY_MS * 2u64.pow(attempt);
    let jitter_range = base_delay / 4;
    let jitter = rand::rng().random_range(0..=jitter_range * 2);
    base_delay - jitter_range + jitter
}
