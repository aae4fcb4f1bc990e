//! Error types for archive-related values.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid archive-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// The source URL does not name a supported archive format.
    #[error("unsupported archive format for \"{url}\"; expected one of: {expected}")]
    UnsupportedFormat {
        /// The rejected URL.
        url: String,
        /// Comma-separated list of accepted suffixes.
        expected: String,
    },

    /// No version could be derived from the source URL.
    #[error("cannot derive a version from \"{url}\"")]
    VersionUndetectable {
        /// The URL that carried no recognisable version.
        url: String,
    },
}

/// Result type alias using [`ArchiveError`].
pub type Result<T> = std::result::Result<T, ArchiveError>;
