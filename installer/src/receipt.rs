//! Install receipts recording completed installations.
//!
//! A receipt is written into the keg only after the smoke test has passed:
//! `<root>/Cellar/<name>/<version>/INSTALL_RECEIPT.json`. A keg without a
//! receipt is therefore incomplete and never reported as installed.

use crate::archive::sha256_digest::Sha256Digest;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// File name of the receipt inside a keg.
pub const RECEIPT_FILENAME: &str = "INSTALL_RECEIPT.json";

/// Record of one completed installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Package name.
    pub name: String,
    /// Installed version, or `HEAD`.
    pub version: String,
    /// Archive URL for pinned builds, clone URL for head builds.
    pub source_url: String,
    /// Verified digest of the source archive; absent for head builds.
    pub sha256: Option<Sha256Digest>,
    /// Whether the source was checksum-verified.
    pub verified: bool,
    /// Whether the build came from the mutable head branch.
    pub head: bool,
    /// Completion time in seconds since the Unix epoch.
    pub installed_at: u64,
}

impl InstallReceipt {
    /// Receipt for a build from the pinned, verified archive.
    #[must_use]
    pub fn pinned(name: &str, version: &str, source_url: &str, sha256: Sha256Digest) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            source_url: source_url.to_owned(),
            sha256: Some(sha256),
            verified: true,
            head: false,
            installed_at: now_unix_seconds(),
        }
    }

    /// Receipt for an unverified build from the head branch.
    #[must_use]
    pub fn head(name: &str, version: &str, clone_url: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            source_url: clone_url.to_owned(),
            sha256: None,
            verified: false,
            head: true,
            installed_at: now_unix_seconds(),
        }
    }

    /// Path of the receipt inside `keg`.
    #[must_use]
    pub fn path_in(keg: &Utf8Path) -> Utf8PathBuf {
        keg.join(RECEIPT_FILENAME)
    }

    /// Write the receipt into `keg`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Receipt`] if serialisation or the write fails.
    pub fn write(&self, keg: &Utf8Path) -> Result<Utf8PathBuf> {
        let path = Self::path_in(keg);
        let json = serde_json::to_string_pretty(self).map_err(|e| InstallerError::Receipt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| InstallerError::Receipt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        log::debug!("wrote receipt {path}");
        Ok(path)
    }

    /// Read the receipt from `keg`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Receipt`] if the file exists but cannot be
    /// read or parsed.
    pub fn read(keg: &Utf8Path) -> Result<Option<Self>> {
        let path = Self::path_in(keg);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| InstallerError::Receipt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| InstallerError::Receipt {
                path,
                reason: e.to_string(),
            })
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
