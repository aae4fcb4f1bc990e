//! Streaming SHA-256 computation for downloaded archives.

use super::sha256_digest::Sha256Digest;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Errors arising from checksum verification.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The archive could not be read.
    #[error("failed to read archive for hashing: {0}")]
    Io(#[from] std::io::Error),

    /// The archive digest differs from the recorded one.
    #[error("expected {expected}, got {actual}")]
    Mismatch {
        /// Digest recorded in the formula.
        expected: Sha256Digest,
        /// Digest of the bytes on disk.
        actual: Sha256Digest,
    },
}

/// Compute the SHA-256 digest of a file, reading it in fixed-size chunks.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn compute_sha256(path: &Path) -> std::io::Result<Sha256Digest> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(Sha256Digest::from_bytes(&hasher.finalize()))
}

/// Verify that the file at `path` hashes to `expected`.
///
/// Returns the computed digest on success.
///
/// # Errors
///
/// Returns [`ChecksumError::Mismatch`] when the digests differ and
/// [`ChecksumError::Io`] when the file cannot be read.
pub fn verify_sha256(path: &Path, expected: &Sha256Digest) -> Result<Sha256Digest, ChecksumError> {
    let actual = compute_sha256(path)?;
    if &actual != expected {
        return Err(ChecksumError::Mismatch {
            expected: expected.clone(),
            actual,
        });
    }
    Ok(actual)
}
