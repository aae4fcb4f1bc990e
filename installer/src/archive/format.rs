//! Archive format detection from the source URL.

use super::error::{ArchiveError, Result};
use std::fmt;

/// Compression wrapped around a source tarball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// A gzip-compressed tarball (`.tar.gz` or `.tgz`).
    TarGz,
    /// A zstd-compressed tarball (`.tar.zst`).
    TarZst,
}

/// Suffixes recognised for each format, longest first.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::TarGz),
    (".tar.zst", ArchiveFormat::TarZst),
];

impl ArchiveFormat {
    /// Detect the archive format from a URL or filename.
    ///
    /// Query strings and fragments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnsupportedFormat`] when no known suffix
    /// matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::archive::format::ArchiveFormat;
    ///
    /// let format = ArchiveFormat::from_url("https://example.com/v1.0.1.tar.gz")
    ///     .expect("tarball");
    /// assert_eq!(format, ArchiveFormat::TarGz);
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let path = strip_query(url);
        SUFFIXES
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map(|(_, format)| *format)
            .ok_or_else(|| ArchiveError::UnsupportedFormat {
                url: url.to_owned(),
                expected: SUFFIXES
                    .iter()
                    .map(|(suffix, _)| *suffix)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Remove this format's suffix from a filename, if present.
    #[must_use]
    pub fn strip_suffix(self, filename: &str) -> Option<&str> {
        SUFFIXES
            .iter()
            .filter(|(_, format)| *format == self)
            .find_map(|(suffix, _)| filename.strip_suffix(suffix))
    }

    /// Canonical suffix used when naming the staged download.
    #[must_use]
    pub const fn canonical_suffix(self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::TarZst => ".tar.zst",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TarGz => write!(f, "tar+gzip"),
            Self::TarZst => write!(f, "tar+zstd"),
        }
    }
}

/// Drop any query string or fragment from a URL.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
