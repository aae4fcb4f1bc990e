//! Error types for the formula installer.
//!
//! This module defines semantic error variants that tell the operator which
//! phase failed, what was being run, and what it printed. Each error includes
//! recovery hints where applicable. No variant is ever recovered silently:
//! every failure aborts the remaining sequence.

use crate::archive::download::DownloadError;
use crate::archive::extraction::ExtractionError;
use crate::archive::sha256_digest::Sha256Digest;
use crate::descriptor::DescriptorError;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Phase of the install sequence an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Loading the formula and preparing directories.
    Setup,
    /// Fetching the source and verifying its checksum.
    Validate,
    /// Checking that build-time tools are available.
    ResolveDependencies,
    /// Running the install procedure.
    Install,
    /// Running the smoke test against the installed binary.
    SmokeTest,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Setup => "setup",
            Self::Validate => "validate",
            Self::ResolveDependencies => "resolve-dependencies",
            Self::Install => "install",
            Self::SmokeTest => "smoke-test",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The downloaded archive does not hash to the formula's checksum.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The URL the archive was fetched from.
        url: String,
        /// Digest recorded in the formula.
        expected: Sha256Digest,
        /// Digest of the downloaded bytes.
        actual: Sha256Digest,
    },

    /// A required build tool is not available.
    #[error("build dependency {tool} is missing; {hint}")]
    DependencyMissing {
        /// Name of the missing tool.
        tool: String,
        /// How to make the tool available.
        hint: String,
    },

    /// An install step exited unsuccessfully.
    #[error("install step {step} failed: `{command}` exited with {status}\n{output}")]
    BuildFailed {
        /// One-based position of the failing step.
        step: usize,
        /// The expanded command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured stdout and stderr, verbatim.
        output: String,
    },

    /// The smoke test exited unsuccessfully.
    #[error("smoke test `{command}` exited with {status}; installation rolled back\n{output}")]
    VerificationFailed {
        /// The expanded command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured stdout and stderr, verbatim.
        output: String,
    },

    /// The formula could not be loaded.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The source archive could not be downloaded.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The source archive could not be unpacked.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// A step template could not be expanded.
    #[error("cannot expand step: {0}")]
    Template(#[from] crate::template::TemplateError),

    /// The formula has no head source but a head build was requested.
    #[error("{name} declares no head source; install the pinned release instead")]
    NoHeadSource {
        /// Package name.
        name: String,
    },

    /// Git clone of the head branch failed.
    #[error("git {operation} failed: {message}")]
    Git {
        /// The git operation that failed.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Failed to prepare or populate the keg directory.
    #[error("staging failed: {reason}")]
    StagingFailed {
        /// Description of the staging failure.
        reason: String,
    },

    /// The installation root exists but is not writable.
    #[error("installation root {path} is not writable: {reason}")]
    TargetNotWritable {
        /// Path to the non-writable directory.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// The package is not installed.
    #[error("{name} is not installed; run: formula-installer install")]
    NotInstalled {
        /// Package name.
        name: String,
    },

    /// An install receipt could not be read or written.
    #[error("install receipt {path}: {reason}")]
    Receipt {
        /// Path to the receipt.
        path: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to scan the cellar for installed packages.
    #[error("failed to scan installation root")]
    ScanFailed {
        /// The underlying error that caused the scan to fail.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl InstallerError {
    /// The phase this error aborts.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::error::{InstallerError, Phase};
    ///
    /// let err = InstallerError::DependencyMissing {
    ///     tool: "rust".to_owned(),
    ///     hint: "install rustup".to_owned(),
    /// };
    /// assert_eq!(err.phase(), Phase::ResolveDependencies);
    /// ```
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::ChecksumMismatch { .. } | Self::Download(_) | Self::Git { .. } => {
                Phase::Validate
            }
            Self::DependencyMissing { .. } => Phase::ResolveDependencies,
            Self::BuildFailed { .. } | Self::Extraction(_) | Self::Template(_) => Phase::Install,
            Self::VerificationFailed { .. } => Phase::SmokeTest,
            _ => Phase::Setup,
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
