//! Output formatting for package listing.
//!
//! This module formats installed kegs for human-readable or JSON output.

use serde::Serialize;

use crate::scanner::{InstalledKeg, InstalledKegs};

/// Format installed packages for human-readable output.
///
/// # Examples
///
/// ```
/// use formula_installer::list_output::format_human;
/// use formula_installer::scanner::InstalledKegs;
///
/// let kegs = InstalledKegs::default();
/// let output = format_human(&kegs);
/// assert!(output.contains("No packages installed"));
/// ```
#[must_use]
pub fn format_human(kegs: &InstalledKegs) -> String {
    if kegs.is_empty() {
        return String::from(
            "No packages installed.\n\nRun `formula-installer` to install csv_converter.",
        );
    }

    let mut output = String::from("Installed packages:\n");

    for (name, versions) in &kegs.by_package {
        output.push('\n');
        output.push_str(&format!("{name}\n"));

        for keg in versions {
            let marker = if keg.receipt.verified {
                ""
            } else {
                " (unverified)"
            };
            output.push_str(&format!(
                "  {}{marker}  {}\n",
                keg.receipt.version, keg.path
            ));
        }
    }

    output
}

/// Format installed packages as JSON.
///
/// # Examples
///
/// ```
/// use formula_installer::list_output::format_json;
/// use formula_installer::scanner::InstalledKegs;
///
/// let json = format_json(&InstalledKegs::default());
/// assert!(json.contains("\"packages\""));
/// ```
#[must_use]
pub fn format_json(kegs: &InstalledKegs) -> String {
    let json_data = InstalledPackagesJson::from_installed(kegs);

    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON-serializable representation of installed packages.
#[derive(Debug, Serialize)]
pub struct InstalledPackagesJson {
    /// Installed packages, sorted by name.
    pub packages: Vec<PackageEntry>,
}

impl InstalledPackagesJson {
    fn from_installed(kegs: &InstalledKegs) -> Self {
        let packages = kegs
            .by_package
            .iter()
            .map(|(name, versions)| PackageEntry {
                name: name.clone(),
                versions: versions.iter().map(VersionEntry::from).collect(),
            })
            .collect();

        Self { packages }
    }
}

/// JSON entry for a package.
#[derive(Debug, Serialize)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,
    /// Installed versions.
    pub versions: Vec<VersionEntry>,
}

/// JSON entry for one installed version.
#[derive(Debug, Serialize)]
pub struct VersionEntry {
    /// Version, or `HEAD`.
    pub version: String,
    /// Keg path.
    pub path: String,
    /// Whether the source was checksum-verified.
    pub verified: bool,
    /// Whether the build came from the head branch.
    pub head: bool,
    /// Verified source digest, if any.
    pub sha256: Option<String>,
    /// Completion time in seconds since the Unix epoch.
    pub installed_at: u64,
}

impl From<&InstalledKeg> for VersionEntry {
    fn from(keg: &InstalledKeg) -> Self {
        let receipt = &keg.receipt;
        Self {
            version: receipt.version.clone(),
            path: keg.path.to_string(),
            verified: receipt.verified,
            head: receipt.head,
            sha256: receipt.sha256.as_ref().map(|d| d.as_str().to_owned()),
            installed_at: receipt.installed_at,
        }
    }
}
