//! Keg layout under the installation root.
//!
//! This module owns the on-disk layout `<root>/Cellar/<name>/<version>/`,
//! creating kegs before the install procedure runs and removing them when an
//! install or smoke test fails. A keg being replaced is parked beside itself
//! until its replacement is complete.

use crate::dirs::{BaseDirs, formula_root};
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Directory under the root that holds every keg.
pub const CELLAR_DIRNAME: &str = "Cellar";

/// Name prefix of a keg moved aside during a reinstall.
///
/// Dot-prefixed rack entries are never reported as installed.
const PARKED_PREFIX: &str = ".previous-";

/// A completed keg moved aside while its replacement is built.
///
/// Exactly one of [`ParkedKeg::restore`] or [`ParkedKeg::discard`] should
/// follow once the replacement has succeeded or failed.
#[derive(Debug)]
pub struct ParkedKeg {
    keg: Utf8PathBuf,
    parked: Utf8PathBuf,
}

impl ParkedKeg {
    /// Where the previous keg currently lives.
    #[must_use]
    pub fn parked_path(&self) -> &Utf8Path {
        &self.parked
    }

    /// Put the previous keg back, replacing whatever is at its path.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::StagingFailed`] if the keg cannot be moved
    /// back; the previous keg is then left at [`ParkedKeg::parked_path`].
    pub fn restore(self) -> Result<()> {
        if self.keg.exists() {
            fs::remove_dir_all(&self.keg).map_err(|e| InstallerError::StagingFailed {
                reason: format!("failed to clear {} before restoring: {e}", self.keg),
            })?;
        }
        fs::rename(&self.parked, &self.keg).map_err(|e| InstallerError::StagingFailed {
            reason: format!("failed to restore {} from {}: {e}", self.keg, self.parked),
        })?;
        log::info!("restored previous keg {}", self.keg);
        Ok(())
    }

    /// Delete the previous keg once its replacement is complete.
    pub fn discard(self) {
        if let Err(err) = fs::remove_dir_all(&self.parked) {
            log::warn!("could not remove previous keg {}: {err}", self.parked);
        }
    }
}

/// Handles keg creation and removal below an installation root.
#[derive(Debug, Clone)]
pub struct Cellar {
    root: Utf8PathBuf,
}

impl Cellar {
    /// Create a cellar rooted at `root`.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// The installation root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The directory holding every package's kegs.
    #[must_use]
    pub fn cellar_path(&self) -> Utf8PathBuf {
        self.root.join(CELLAR_DIRNAME)
    }

    /// The directory holding every keg of `name`.
    #[must_use]
    pub fn rack_path(&self, name: &str) -> Utf8PathBuf {
        self.cellar_path().join(name)
    }

    /// The keg (installation prefix) for one version of `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use formula_installer::cellar::Cellar;
    ///
    /// let cellar = Cellar::new(Utf8PathBuf::from("/opt/formula"));
    /// assert_eq!(
    ///     cellar.keg_path("csv_converter", "1.0.1"),
    ///     Utf8PathBuf::from("/opt/formula/Cellar/csv_converter/1.0.1")
    /// );
    /// ```
    #[must_use]
    pub fn keg_path(&self, name: &str, version: &str) -> Utf8PathBuf {
        self.rack_path(name).join(version)
    }

    /// Create an empty keg, replacing any leftover from an earlier attempt.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::TargetNotWritable`] if the keg cannot be
    /// created or written to.
    pub fn prepare_keg(&self, name: &str, version: &str) -> Result<Utf8PathBuf> {
        let keg = self.keg_path(name, version);

        if keg.exists() {
            log::debug!("clearing existing keg {keg}");
            fs::remove_dir_all(&keg).map_err(|e| InstallerError::TargetNotWritable {
                path: keg.clone(),
                reason: e.to_string(),
            })?;
        }

        fs::create_dir_all(keg.join("bin")).map_err(|e| InstallerError::TargetNotWritable {
            path: keg.clone(),
            reason: e.to_string(),
        })?;

        // Verify writability by attempting to create a temp file
        let probe = keg.join(".formula-installer-probe");
        match fs::write(&probe, b"probe") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                Ok(keg)
            }
            Err(e) => Err(InstallerError::TargetNotWritable {
                path: keg,
                reason: e.to_string(),
            }),
        }
    }

    /// Move an existing keg aside so a failed rebuild can put it back.
    ///
    /// Returns `None` when there is no keg to preserve. A parked keg left
    /// behind by an interrupted run is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::TargetNotWritable`] if the keg cannot be
    /// moved.
    pub fn park_keg(&self, name: &str, version: &str) -> Result<Option<ParkedKeg>> {
        let keg = self.keg_path(name, version);
        if !keg.exists() {
            return Ok(None);
        }

        let parked = self.rack_path(name).join(format!("{PARKED_PREFIX}{version}"));
        let not_writable = |e: std::io::Error| InstallerError::TargetNotWritable {
            path: keg.clone(),
            reason: e.to_string(),
        };
        if parked.exists() {
            fs::remove_dir_all(&parked).map_err(not_writable)?;
        }
        fs::rename(&keg, &parked).map_err(not_writable)?;
        log::debug!("parked {keg} at {parked}");

        Ok(Some(ParkedKeg { keg, parked }))
    }

    /// Remove a keg and, if it was the last one, its rack.
    ///
    /// Removing a keg that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::StagingFailed`] if the keg cannot be removed.
    pub fn remove_keg(&self, name: &str, version: &str) -> Result<()> {
        let keg = self.keg_path(name, version);
        if keg.exists() {
            fs::remove_dir_all(&keg).map_err(|e| InstallerError::StagingFailed {
                reason: format!("failed to remove {keg}: {e}"),
            })?;
            log::info!("removed {keg}");
        }

        let rack = self.rack_path(name);
        let rack_is_empty = rack
            .read_dir_utf8()
            .is_ok_and(|mut entries| entries.next().is_none());
        if rack_is_empty {
            let _ = fs::remove_dir(&rack);
        }
        Ok(())
    }

    /// Remove a keg after a failed install.
    ///
    /// Rollback errors are logged, never returned.
    pub fn rollback(&self, name: &str, version: &str) {
        if let Err(err) = self.remove_keg(name, version) {
            log::warn!("rollback of {name} {version} incomplete: {err}");
        }
    }
}

/// Return the default installation root for the current platform.
///
/// The base directory comes from [`formula_root`], which honours the
/// `FORMULA_ROOT` environment variable and otherwise resolves to a per-user,
/// platform-specific local data directory (for example `~/.local/share` on
/// many Linux distributions) joined with `formula`.
#[must_use]
pub fn default_root(dirs: &dyn BaseDirs) -> Option<Utf8PathBuf> {
    formula_root(dirs).and_then(|p| Utf8PathBuf::try_from(p).ok())
}

/// Determines the installation root from CLI or falls back to the default.
///
/// # Errors
///
/// Returns [`InstallerError::StagingFailed`] if no root can be determined.
pub fn determine_root(cli_root: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    cli_root
        .map(Utf8Path::to_owned)
        .or_else(|| default_root(dirs))
        .ok_or_else(|| InstallerError::StagingFailed {
            reason: "could not determine default installation root; pass --root".to_owned(),
        })
}
