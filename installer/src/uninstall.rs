//! Uninstall command implementation.
//!
//! Removes completed kegs found by the scanner. Incomplete kegs (no receipt)
//! are invisible here, as they are to `list`.

use std::io::Write;

use crate::cellar::Cellar;
use crate::cli::UninstallArgs;
use crate::error::{InstallerError, Result};
use crate::scanner::scan_installed;

/// Remove the requested versions of a package and report each removal.
///
/// Without a version every installed version is removed; the rack goes with
/// the last keg.
///
/// # Errors
///
/// Returns [`InstallerError::NotInstalled`] when no matching keg exists,
/// [`InstallerError::ScanFailed`] if the cellar cannot be read, and
/// [`InstallerError::WriteFailed`] if reporting fails.
pub fn run_uninstall(
    args: &UninstallArgs,
    cellar: &Cellar,
    stdout: &mut dyn Write,
) -> Result<Vec<String>> {
    let installed =
        scan_installed(cellar.root()).map_err(|e| InstallerError::ScanFailed { source: e })?;

    let versions: Vec<String> = installed
        .kegs_of(&args.name)
        .iter()
        .map(|keg| keg.receipt.version.clone())
        .filter(|version| args.version.as_ref().is_none_or(|wanted| wanted == version))
        .collect();

    if versions.is_empty() {
        return Err(InstallerError::NotInstalled {
            name: match &args.version {
                Some(version) => format!("{} {version}", args.name),
                None => args.name.clone(),
            },
        });
    }

    for version in &versions {
        cellar.remove_keg(&args.name, version)?;
        writeln!(stdout, "Uninstalled {} {version}", args.name)
            .map_err(|e| InstallerError::WriteFailed { source: e })?;
    }

    Ok(versions)
}
