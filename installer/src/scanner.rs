//! Keg scanner for discovering installed packages.
//!
//! This module walks `<root>/Cellar/<name>/<version>/` and reads each keg's
//! install receipt. Kegs without a receipt are incomplete and are skipped, as
//! are dot-prefixed entries such as kegs parked during a reinstall.

use std::collections::BTreeMap;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::cellar::CELLAR_DIRNAME;
use crate::receipt::InstallReceipt;

/// One completed installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledKeg {
    /// Receipt written after the smoke test passed.
    pub receipt: InstallReceipt,
    /// Full path to the keg.
    pub path: Utf8PathBuf,
}

/// Installed kegs grouped by package name.
#[derive(Debug, Clone, Default)]
pub struct InstalledKegs {
    /// Map from package name to its kegs, sorted by version directory.
    pub by_package: BTreeMap<String, Vec<InstalledKeg>>,
}

impl InstalledKegs {
    /// Returns true if nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_package.is_empty()
    }

    /// Kegs of one package.
    #[must_use]
    pub fn kegs_of(&self, name: &str) -> &[InstalledKeg] {
        self.by_package.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Scan the installation root for completed kegs.
///
/// The layout is:
/// ```text
/// {root}/Cellar/{name}/{version}/INSTALL_RECEIPT.json
/// ```
///
/// # Errors
///
/// Returns an error if a directory cannot be read. Unreadable receipts are
/// logged and the keg skipped.
pub fn scan_installed(root: &Utf8Path) -> io::Result<InstalledKegs> {
    let mut result = InstalledKegs::default();
    let cellar = root.join(CELLAR_DIRNAME);

    if !cellar.is_dir() {
        return Ok(result);
    }

    for entry in cellar.read_dir_utf8()? {
        let entry = entry?;
        if !entry.path().is_dir() || entry.file_name().starts_with('.') {
            continue;
        }

        let kegs = scan_rack(entry.path())?;
        if !kegs.is_empty() {
            result.by_package.insert(entry.file_name().to_owned(), kegs);
        }
    }

    Ok(result)
}

/// Scan one package's rack for kegs with receipts.
fn scan_rack(rack: &Utf8Path) -> io::Result<Vec<InstalledKeg>> {
    let mut kegs = Vec::new();

    for entry in rack.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || entry.file_name().starts_with('.') {
            continue;
        }

        match InstallReceipt::read(path) {
            Ok(Some(receipt)) => kegs.push(InstalledKeg {
                receipt,
                path: path.to_owned(),
            }),
            Ok(None) => log::debug!("skipping incomplete keg {path}"),
            Err(err) => log::warn!("skipping keg {path}: {err}"),
        }
    }

    kegs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(kegs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::sha256_digest::Sha256Digest;
    use tempfile::TempDir;

    fn write_keg(root: &Utf8Path, name: &str, version: &str, receipt: Option<&InstallReceipt>) {
        let keg = root.join(CELLAR_DIRNAME).join(name).join(version);
        std::fs::create_dir_all(keg.join("bin")).expect("failed to create keg");
        if let Some(receipt) = receipt {
            receipt.write(&keg).expect("failed to write receipt");
        }
    }

    fn pinned(version: &str) -> InstallReceipt {
        InstallReceipt::pinned(
            "csv_converter",
            version,
            "https://example.test/v1.0.1.tar.gz",
            Sha256Digest::try_from("a".repeat(64)).expect("valid digest"),
        )
    }

    #[test]
    fn scan_nonexistent_directory_returns_empty() {
        let result =
            scan_installed(Utf8Path::new("/nonexistent/path")).expect("scan should succeed");
        assert!(result.is_empty());
    }

    #[test]
    fn scan_finds_kegs_with_receipts() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("non-UTF8 path");
        write_keg(root, "csv_converter", "1.0.1", Some(&pinned("1.0.1")));
        write_keg(
            root,
            "csv_converter",
            "HEAD",
            Some(&InstallReceipt::head("csv_converter", "HEAD", "https://example.test/x.git")),
        );

        let result = scan_installed(root).expect("scan should succeed");
        let kegs = result.kegs_of("csv_converter");
        assert_eq!(kegs.len(), 2);
        assert_eq!(
            kegs.iter().map(|k| k.receipt.version.as_str()).collect::<Vec<_>>(),
            ["1.0.1", "HEAD"]
        );
    }

    #[test]
    fn scan_skips_incomplete_and_corrupt_kegs() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("non-UTF8 path");
        write_keg(root, "csv_converter", "1.0.0", None);
        write_keg(root, "csv_converter", "1.0.1", None);
        std::fs::write(
            root.join("Cellar/csv_converter/1.0.1/INSTALL_RECEIPT.json"),
            "garbage",
        )
        .expect("write corrupt receipt");

        let result = scan_installed(root).expect("scan should succeed");
        assert!(result.is_empty());
    }

    #[test]
    fn scan_ignores_hidden_entries() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("non-UTF8 path");
        write_keg(root, "csv_converter", "1.0.1", Some(&pinned("1.0.1")));
        write_keg(root, "csv_converter", ".previous-1.0.0", Some(&pinned("1.0.0")));
        write_keg(root, ".cache", "1.0.0", Some(&pinned("1.0.0")));

        let result = scan_installed(root).expect("scan should succeed");
        assert_eq!(result.by_package.len(), 1);
        let kegs = result.kegs_of("csv_converter");
        assert_eq!(kegs.len(), 1);
        assert_eq!(kegs[0].receipt.version, "1.0.1");
    }
}
