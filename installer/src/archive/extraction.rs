//! Source tarball extraction.
//!
//! Extracts `.tar.gz` and `.tar.zst` archives into the staging directory with
//! path traversal protection, and locates the source root inside the
//! extracted tree.

use super::format::ArchiveFormat;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// The unpacked source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSource {
    /// Directory that build steps run in.
    pub root: PathBuf,
    /// Number of entries unpacked.
    pub entries: usize,
}

/// Trait for extracting source archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use formula_installer::archive::extraction::TarExtractor;
///
/// let extractor = TarExtractor;
/// // Use extractor.extract(archive_path, format, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no entries are found.
    /// Returns [`ExtractionError::Io`] on I/O or decoding failures.
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<ExtractedSource, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no entries.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default extractor using the `tar`, `flate2`, and `zstd` crates.
///
/// Validates each entry path before extraction to guard against
/// path traversal attacks (zip-slip).
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl ArchiveExtractor for TarExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> Result<ExtractedSource, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let top_level = match format {
            ArchiveFormat::TarGz => unpack(flate2::read::GzDecoder::new(file), dest_dir)?,
            ArchiveFormat::TarZst => unpack(zstd::Decoder::new(file)?, dest_dir)?,
        };

        if top_level.entries == 0 {
            return Err(ExtractionError::EmptyArchive);
        }

        let root = source_root(dest_dir, &top_level.names);
        log::debug!(
            "unpacked {} entries from {}; source root {}",
            top_level.entries,
            archive_path.display(),
            root.display()
        );
        Ok(ExtractedSource {
            root,
            entries: top_level.entries,
        })
    }
}

/// Names of the top-level components seen while unpacking.
struct TopLevel {
    names: BTreeSet<OsString>,
    entries: usize,
}

fn unpack<R: Read>(reader: R, dest_dir: &Path) -> Result<TopLevel, ExtractionError> {
    std::fs::create_dir_all(dest_dir)?;
    let mut archive = tar::Archive::new(reader);
    let mut names = BTreeSet::new();
    let mut entries = 0;

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        if entry.header().entry_type().is_pax_global_extensions() {
            continue;
        }
        let entry_path = entry.path()?.into_owned();

        validate_entry_path(&entry_path)?;

        // `unpack_in` also refuses parents that resolve outside `dest_dir`
        // through symlinks unpacked earlier.
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }

        if let Some(Component::Normal(first)) = entry_path.components().next() {
            names.insert(first.to_owned());
        }
        entries += 1;
    }

    Ok(TopLevel { names, entries })
}

/// Return the single top-level directory when the archive wraps its
/// contents in one, as release tarballs do; otherwise `dest_dir` itself.
fn source_root(dest_dir: &Path, top_level: &BTreeSet<OsString>) -> PathBuf {
    let mut names = top_level.iter();
    match (names.next(), names.next()) {
        (Some(only), None) if dest_dir.join(only).is_dir() => dest_dir.join(only),
        _ => dest_dir.to_path_buf(),
    }
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    if path.is_absolute() {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}
