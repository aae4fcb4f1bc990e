//! Source archive handling: digests, formats, download, and extraction.
//!
//! # Sub-modules
//!
//! - [`checksum`] - Streaming SHA-256 computation and comparison.
//! - [`download`] - Source fetch trait and HTTP implementation.
//! - [`error`] - Validation errors for archive-related values.
//! - [`extraction`] - Tarball extraction with path traversal protection.
//! - [`format`] - Archive format detection from the source URL.
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`version`] - Version derivation from versioned archive URLs.

pub mod checksum;
pub mod download;
pub mod error;
pub mod extraction;
pub mod format;
pub mod sha256_digest;
pub mod version;
