//! Semantic wrapper for package names.
//!
//! This module provides the [`PackageName`] newtype for type-safe handling of
//! formula names throughout the installer. Names double as directory names in
//! the cellar, so the accepted alphabet is deliberately narrow.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A validated package name.
///
/// # Examples
///
/// ```
/// use formula_installer::package_name::PackageName;
///
/// let name = PackageName::parse("csv_converter").expect("valid name");
/// assert_eq!(name.as_str(), "csv_converter");
/// assert!(PackageName::parse("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

/// Reason a package name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid package name \"{value}\": {reason}")]
pub struct PackageNameError {
    /// The rejected name.
    pub value: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl PackageName {
    /// Validate and wrap a package name.
    ///
    /// Names must start with an ASCII letter or digit and contain only ASCII
    /// letters, digits, `_`, `-`, `.`, and `+`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageNameError`] when the name is empty or contains
    /// characters outside the accepted set.
    pub fn parse(value: &str) -> Result<Self, PackageNameError> {
        let Some(first) = value.chars().next() else {
            return Err(PackageNameError {
                value: value.to_owned(),
                reason: "name is empty",
            });
        };
        if !first.is_ascii_alphanumeric() {
            return Err(PackageNameError {
                value: value.to_owned(),
                reason: "name must start with a letter or digit",
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
        {
            return Err(PackageNameError {
                value: value.to_owned(),
                reason: "name may only contain letters, digits, '_', '-', '.', and '+'",
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Get the package name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
