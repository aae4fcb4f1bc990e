//! Install pipeline orchestration.
//!
//! This module drives one formula through the fixed sequence
//! `validate → resolve-dependencies → install → smoke-test`, coordinating
//! the fetcher, extractor, command executor, and cellar. The sequence is
//! strictly linear: the first failure aborts every later phase, and a keg
//! that fails its install or smoke test is removed again. A keg replaced by
//! `--force` is moved aside first and put back if the rebuild fails.

use crate::archive::checksum::{ChecksumError, verify_sha256};
use crate::archive::download::{HttpFetcher, SourceFetcher};
use crate::archive::extraction::{ArchiveExtractor, TarExtractor};
use crate::archive::sha256_digest::Sha256Digest;
use crate::builder::run_install_procedure;
use crate::cellar::Cellar;
use crate::deps::{CommandExecutor, SystemCommandExecutor, resolve_build_dependencies};
use crate::descriptor::{HEAD_VERSION, PackageDescriptor};
use crate::error::{InstallerError, Result};
use crate::git::{GitCloner, HeadCloner};
use crate::output::{head_warning, write_stderr_line};
use crate::receipt::InstallReceipt;
use crate::smoke::run_test_procedure;
use crate::template::TemplateContext;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;
use tempfile::TempDir;

/// The external collaborators a pipeline run depends on.
///
/// Production code uses [`Toolbox::system`]; tests inject stubs.
#[derive(Clone, Copy)]
pub struct Toolbox<'a> {
    /// Downloads pinned source archives.
    pub fetcher: &'a dyn SourceFetcher,
    /// Unpacks source archives.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Clones head branches.
    pub cloner: &'a dyn HeadCloner,
    /// Runs probes, install steps, and smoke tests.
    pub executor: &'a dyn CommandExecutor,
}

impl Toolbox<'static> {
    /// Collaborators backed by the network, `tar`, `git`, and real processes.
    #[must_use]
    pub fn system() -> Self {
        Self {
            fetcher: &HttpFetcher,
            extractor: &TarExtractor,
            cloner: &GitCloner,
            executor: &SystemCommandExecutor,
        }
    }
}

/// A source archive whose digest matched the formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedArchive {
    /// Location of the archive inside the staging directory.
    pub path: Utf8PathBuf,
    /// The verified digest.
    pub sha256: Sha256Digest,
}

/// The four operations of a formula, bound to a set of collaborators.
pub struct Installer<'a> {
    descriptor: &'a PackageDescriptor,
    tools: Toolbox<'a>,
}

impl<'a> Installer<'a> {
    /// Bind `descriptor` to `tools`.
    #[must_use]
    pub fn new(descriptor: &'a PackageDescriptor, tools: Toolbox<'a>) -> Self {
        Self { descriptor, tools }
    }

    /// The formula being installed.
    #[must_use]
    pub fn descriptor(&self) -> &PackageDescriptor {
        self.descriptor
    }

    /// Fetch the pinned archive into `staging` and verify its checksum.
    ///
    /// Only the staged archive is written; nothing is built or installed.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Download`] if the fetch fails and
    /// [`InstallerError::ChecksumMismatch`] if the digest differs.
    pub fn validate(&self, staging: &Utf8Path) -> Result<VerifiedArchive> {
        let source = self.descriptor.source();
        let filename = format!(
            "{}-{}{}",
            self.descriptor.name(),
            self.descriptor.version(),
            self.descriptor.archive_format().canonical_suffix()
        );
        let path = staging.join(filename);

        log::info!("fetching {}", source.url);
        self.tools.fetcher.fetch(&source.url, path.as_std_path())?;

        let sha256 = verify_sha256(path.as_std_path(), &source.sha256).map_err(|err| match err {
            ChecksumError::Mismatch { expected, actual } => InstallerError::ChecksumMismatch {
                url: source.url.clone(),
                expected,
                actual,
            },
            ChecksumError::Io(io) => InstallerError::Io(io),
        })?;
        log::info!("verified {} ({})", source.url, sha256.short());

        Ok(VerifiedArchive { path, sha256 })
    }

    /// Check that every build dependency is available.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::DependencyMissing`] for the first missing tool.
    pub fn resolve_build_dependencies(&self) -> Result<()> {
        resolve_build_dependencies(self.tools.executor, self.descriptor.build_dependencies())
    }

    /// Run the install procedure in `source_root`, installing into `keg`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::BuildFailed`] for the first failing step.
    pub fn install(&self, source_root: &Utf8Path, keg: &Utf8Path, version: &str) -> Result<()> {
        let context = self.context(keg, version);
        run_install_procedure(
            self.tools.executor,
            self.descriptor.install_procedure(),
            &context,
            source_root,
        )
    }

    /// Run the smoke test against `keg`.
    ///
    /// Returns the trimmed stdout of the last test step.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::VerificationFailed`] if a test step fails.
    pub fn run_smoke_test(&self, keg: &Utf8Path, version: &str) -> Result<String> {
        let context = self.context(keg, version);
        run_test_procedure(self.tools.executor, self.descriptor.test_procedure(), &context)
    }

    fn context<'c>(&'c self, keg: &'c Utf8Path, version: &'c str) -> TemplateContext<'c> {
        TemplateContext {
            name: self.descriptor.name().as_str(),
            version,
            prefix: keg,
        }
    }
}

/// Options for one install run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Build the head branch instead of the pinned archive.
    pub head: bool,
    /// Reinstall over an existing keg of the same version.
    pub force: bool,
    /// Keep the staging directory after the run.
    pub keep_staging: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Result of a successful install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The package was built, installed, and smoke-tested.
    Installed {
        /// The keg the package was installed into.
        keg: Utf8PathBuf,
        /// The receipt written into the keg.
        receipt: InstallReceipt,
        /// Trimmed stdout of the smoke test.
        smoke_output: String,
    },
    /// A keg with a receipt for this version already existed.
    AlreadyInstalled {
        /// The existing keg.
        keg: Utf8PathBuf,
        /// Its receipt.
        receipt: InstallReceipt,
    },
}

/// Install a formula using production collaborators.
///
/// # Errors
///
/// Returns the error of the first phase that fails.
pub fn install_package(
    descriptor: &PackageDescriptor,
    cellar: &Cellar,
    options: InstallOptions,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    install_package_with(descriptor, cellar, options, Toolbox::system(), stderr)
}

/// Testable inner function with injected collaborators.
///
/// The production entry point [`install_package`] delegates here with real
/// implementations; tests inject stubs.
///
/// # Errors
///
/// Returns the error of the first phase that fails. Kegs created during a
/// failed run are removed and any keg they replaced is restored before the
/// error is returned.
pub fn install_package_with(
    descriptor: &PackageDescriptor,
    cellar: &Cellar,
    options: InstallOptions,
    tools: Toolbox<'_>,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    let name = descriptor.name().as_str();
    let version = if options.head {
        HEAD_VERSION
    } else {
        descriptor.version()
    };

    if !options.force && !options.head {
        let keg = cellar.keg_path(name, version);
        if let Some(receipt) = existing_receipt(&keg, version) {
            log::info!("{name} {version} already installed at {keg}");
            return Ok(InstallOutcome::AlreadyInstalled { keg, receipt });
        }
    }

    let installer = Installer::new(descriptor, tools);
    let staging = Staging::new()?;
    let progress = Progress {
        quiet: options.quiet,
    };

    let source = if options.head {
        let head = descriptor.head().ok_or_else(|| InstallerError::NoHeadSource {
            name: name.to_owned(),
        })?;
        let warning = head_warning(name, &head.branch);
        log::warn!("{warning}");
        write_stderr_line(stderr, &warning);

        progress.line(stderr, format!("Cloning {} ({})...", head.url, head.branch));
        let dest = staging.path().join("src");
        tools.cloner.clone_head(head, dest.as_std_path())?;
        BuildSource {
            root: dest,
            url: head.url.clone(),
            sha256: None,
        }
    } else {
        progress.line(stderr, format!("Fetching {}...", descriptor.source().url));
        let archive = installer.validate(staging.path())?;
        progress.line(
            stderr,
            format!("Verified SHA-256 {}", archive.sha256.as_str()),
        );

        let extracted = tools.extractor.extract(
            archive.path.as_std_path(),
            descriptor.archive_format(),
            staging.path().join("src").as_std_path(),
        )?;
        log::debug!("unpacked {} entries", extracted.entries);
        BuildSource {
            root: utf8(extracted.root)?,
            url: descriptor.source().url.clone(),
            sha256: Some(archive.sha256),
        }
    };

    progress.line(stderr, "Checking build dependencies...");
    installer.resolve_build_dependencies()?;

    let parked = cellar.park_keg(name, version)?;
    let (keg, receipt, smoke_output) =
        match build_keg(&installer, cellar, source, version, progress, stderr) {
            Ok(built) => built,
            Err(err) => {
                cellar.rollback(name, version);
                if let Some(parked) = parked
                    && let Err(restore_err) = parked.restore()
                {
                    log::warn!("previous {name} {version} could not be restored: {restore_err}");
                }
                return Err(err);
            }
        };
    if let Some(parked) = parked {
        parked.discard();
    }

    if options.keep_staging {
        let kept = staging.keep();
        write_stderr_line(stderr, format!("Staging directory kept at {}", kept.display()));
    }

    Ok(InstallOutcome::Installed {
        keg,
        receipt,
        smoke_output,
    })
}

/// Fetch and verify the pinned archive only, using production collaborators.
///
/// # Errors
///
/// See [`Installer::validate`].
pub fn fetch_package(descriptor: &PackageDescriptor, quiet: bool, stderr: &mut dyn Write) -> Result<Sha256Digest> {
    fetch_package_with(descriptor, quiet, Toolbox::system(), stderr)
}

/// Testable inner function for [`fetch_package`].
///
/// # Errors
///
/// See [`Installer::validate`].
pub fn fetch_package_with(
    descriptor: &PackageDescriptor,
    quiet: bool,
    tools: Toolbox<'_>,
    stderr: &mut dyn Write,
) -> Result<Sha256Digest> {
    let staging = Staging::new()?;
    Progress { quiet }.line(stderr, format!("Fetching {}...", descriptor.source().url));
    let archive = Installer::new(descriptor, tools).validate(staging.path())?;
    Ok(archive.sha256)
}

/// Re-run the smoke test against an installed keg.
///
/// The pinned version's keg is preferred; a head keg is used otherwise.
///
/// # Errors
///
/// Returns [`InstallerError::NotInstalled`] when no completed keg exists,
/// otherwise see [`Installer::run_smoke_test`].
pub fn test_installed_with(
    descriptor: &PackageDescriptor,
    cellar: &Cellar,
    tools: Toolbox<'_>,
) -> Result<(Utf8PathBuf, String)> {
    let name = descriptor.name().as_str();
    let version = [descriptor.version(), HEAD_VERSION]
        .into_iter()
        .find(|version| existing_receipt(&cellar.keg_path(name, version), version).is_some())
        .ok_or_else(|| InstallerError::NotInstalled {
            name: name.to_owned(),
        })?;

    let keg = cellar.keg_path(name, version);
    let output = Installer::new(descriptor, tools).run_smoke_test(&keg, version)?;
    Ok((keg, output))
}

/// The receipt of `keg` when it records `version`.
fn existing_receipt(keg: &Utf8Path, version: &str) -> Option<InstallReceipt> {
    match InstallReceipt::read(keg) {
        Ok(Some(receipt)) if receipt.version == version => Some(receipt),
        Ok(_) => None,
        Err(err) => {
            log::warn!("ignoring unreadable receipt: {err}");
            None
        }
    }
}

/// Scratch directory exclusively owned by one run.
struct Staging {
    dir: TempDir,
    path: Utf8PathBuf,
}

impl Staging {
    fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("formula-installer-")
            .tempdir()
            .map_err(|e| InstallerError::StagingFailed {
                reason: format!("cannot create staging directory: {e}"),
            })?;
        let path = utf8(dir.path().to_path_buf())?;
        log::debug!("staging in {path}");
        Ok(Self { dir, path })
    }

    fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Disable cleanup and return the directory's location.
    fn keep(self) -> std::path::PathBuf {
        self.dir.keep()
    }
}

fn utf8(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path).map_err(|e| InstallerError::StagingFailed {
        reason: format!("staging path is not valid UTF-8: {e}"),
    })
}

/// Where the sources of a run came from, for the receipt.
struct BuildSource {
    root: Utf8PathBuf,
    url: String,
    sha256: Option<Sha256Digest>,
}

/// Create the keg, install into it, smoke-test it, and write its receipt.
///
/// The receipt is stamped once the smoke test has passed. On error the
/// caller owns cleanup of the keg.
fn build_keg(
    installer: &Installer<'_>,
    cellar: &Cellar,
    source: BuildSource,
    version: &str,
    progress: Progress,
    stderr: &mut dyn Write,
) -> Result<(Utf8PathBuf, InstallReceipt, String)> {
    let name = installer.descriptor().name().as_str();
    let keg = cellar.prepare_keg(name, version)?;
    progress.line(stderr, format!("Installing {name} {version} into {keg}..."));
    installer.install(&source.root, &keg, version)?;

    progress.line(stderr, "Running smoke test...");
    let smoke_output = installer.run_smoke_test(&keg, version)?;

    let receipt = match source.sha256 {
        Some(sha256) => InstallReceipt::pinned(name, version, &source.url, sha256),
        None => InstallReceipt::head(name, version, &source.url),
    };
    receipt.write(&keg)?;

    Ok((keg, receipt, smoke_output))
}

/// Quiet-aware progress writer.
#[derive(Clone, Copy)]
struct Progress {
    quiet: bool,
}

impl Progress {
    fn line(self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
