//! Version derivation from versioned source archive URLs.
//!
//! Release archives conventionally embed the version in their final path
//! segment, either as a bare tag (`v1.0.1.tar.gz`) or after the project
//! name (`csv_converter-1.0.1.tar.gz`).

use super::error::{ArchiveError, Result};
use super::format::{ArchiveFormat, strip_query};

/// Derive a version string from a source archive URL.
///
/// # Errors
///
/// Returns [`ArchiveError::VersionUndetectable`] when the final path segment
/// carries no version, and [`ArchiveError::UnsupportedFormat`] when the URL
/// is not a recognised archive.
///
/// # Examples
///
/// ```
/// use formula_installer::archive::version::version_from_url;
///
/// let url = "https://github.com/the-working-party/csv_converter/archive/refs/tags/v1.0.1.tar.gz";
/// assert_eq!(version_from_url(url).expect("version"), "1.0.1");
/// ```
pub fn version_from_url(url: &str) -> Result<String> {
    let format = ArchiveFormat::from_url(url)?;
    let path = strip_query(url);
    let filename = path.rsplit('/').next().unwrap_or(path);
    let stem = format.strip_suffix(filename).unwrap_or(filename);

    version_from_stem(stem).ok_or_else(|| ArchiveError::VersionUndetectable {
        url: url.to_owned(),
    })
}

/// Extract the version from an archive stem such as `v1.0.1` or `pkg-1.0.1`.
fn version_from_stem(stem: &str) -> Option<String> {
    if let Some(version) = normalise(stem) {
        return Some(version);
    }
    stem.match_indices(['-', '_'])
        .map(|(index, _)| index)
        .filter_map(|index| stem.get(index + 1..))
        .find_map(normalise)
}

/// Accept `candidate` when, after an optional `v` prefix, it begins with a
/// digit and contains only version characters.
fn normalise(candidate: &str) -> Option<String> {
    let bare = candidate
        .strip_prefix('v')
        .or_else(|| candidate.strip_prefix('V'))
        .unwrap_or(candidate);
    let starts_with_digit = bare.chars().next().is_some_and(|c| c.is_ascii_digit());
    let well_formed = bare
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'));
    (starts_with_digit && well_formed).then(|| bare.to_owned())
}
