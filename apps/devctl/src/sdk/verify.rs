//! SHA-256 verification for downloaded archives.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::{DevctlError, IoContext, Result};

/// Verifies that a file matches the expected SHA-256 checksum.
///
/// `expected` is compared case-insensitively.
///
/// # Errors
///
/// Returns [`DevctlError::ChecksumMismatch`] if the digests differ, or an
/// I/O error if the file cannot be read.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<()> {
    let computed = compute_sha256(file_path)?;
    let expected = expected.trim().to_lowercase();

    if computed != expected {
        return Err(DevctlError::checksum_mismatch(file_path, expected, computed));
    }

    Ok(())
}

/// Computes the SHA-256 hash of a file as a lowercase hex string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .io_context(|| format!("failed to open {} for checksum", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .io_context(|| format!("failed to read {} for checksum", file_path.display()))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
