//! Package descriptor (formula) model and loading.
//!
//! A formula is a TOML document declaring where to fetch a package's pinned
//! source archive, the SHA-256 digest that archive must hash to, the tools
//! needed only while building, and the ordered install and smoke-test steps.
//! Descriptors are immutable once loaded: they are read, validated, used for
//! one invocation, and discarded.

use crate::archive::format::ArchiveFormat;
use crate::archive::sha256_digest::Sha256Digest;
use crate::archive::version::version_from_url;
use crate::package_name::PackageName;
use crate::template::{check_arg, check_program};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formula for `csv_converter`, bundled into the binary.
pub const BUNDLED_CSV_CONVERTER: &str = include_str!("../formulae/csv_converter.toml");

/// Version label used for builds from the mutable head branch.
pub const HEAD_VERSION: &str = "HEAD";

/// Errors raised while loading a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// The formula file could not be read.
    #[error("cannot read formula {path}: {source}")]
    Read {
        /// Path to the formula file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid formula TOML.
    #[error("malformed formula: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but violates a formula constraint.
    #[error("invalid formula field `{field}`: {reason}")]
    Invalid {
        /// Dotted name of the offending field.
        field: &'static str,
        /// Description of the violated constraint.
        reason: String,
    },
}

/// The pinned, immutable source archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceArchive {
    /// HTTPS URL of the versioned archive.
    pub url: String,
    /// Digest the downloaded archive must hash to.
    pub sha256: Sha256Digest,
}

/// A mutable branch used for unpinned `--head` builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadSource {
    /// Git clone URL.
    pub url: String,
    /// Branch to build.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_owned()
}

/// A tool required only while building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDependency {
    /// Tool name as shown to the operator.
    pub name: String,
    /// Command proving the tool is available; defaults per tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<Vec<String>>,
    /// Remediation hint shown when the tool is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl BuildDependency {
    /// The program and arguments used to check availability.
    ///
    /// Without an explicit probe, `rust` is checked with `cargo --version`
    /// and every other tool with `<name> --version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::descriptor::BuildDependency;
    ///
    /// let rust = BuildDependency { name: "rust".to_owned(), probe: None, hint: None };
    /// assert_eq!(rust.probe_command(), ("cargo".to_owned(), vec!["--version".to_owned()]));
    /// ```
    #[must_use]
    pub fn probe_command(&self) -> (String, Vec<String>) {
        if let Some((program, args)) = self.probe.as_deref().and_then(<[String]>::split_first) {
            return (program.clone(), args.to_vec());
        }
        let program = match self.name.as_str() {
            "rust" => "cargo",
            other => other,
        };
        (program.to_owned(), vec!["--version".to_owned()])
    }

    /// Remediation hint, falling back to a generic suggestion.
    #[must_use]
    pub fn hint_or_default(&self) -> String {
        self.hint
            .clone()
            .unwrap_or_else(|| format!("install {} and make sure it is on PATH", self.name))
    }
}

/// One external command in the install or test procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Program template.
    pub program: String,
    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// On-disk shape of a formula before cross-field validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    name: PackageName,
    desc: String,
    homepage: String,
    license: String,
    #[serde(default)]
    version: Option<String>,
    source: SourceArchive,
    #[serde(default)]
    head: Option<HeadSource>,
    #[serde(default)]
    build_dependencies: Vec<BuildDependency>,
    #[serde(default)]
    install: Vec<Step>,
    #[serde(default)]
    test: Vec<Step>,
}

/// A validated package descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    name: PackageName,
    desc: String,
    homepage: String,
    license: String,
    version: String,
    source: SourceArchive,
    #[serde(skip)]
    format: ArchiveFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    head: Option<HeadSource>,
    build_dependencies: Vec<BuildDependency>,
    install: Vec<Step>,
    test: Vec<Step>,
}

impl PackageDescriptor {
    /// Parse and validate a formula document.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Parse`] for malformed TOML or unknown keys,
    /// and [`DescriptorError::Invalid`] when a field violates a constraint.
    ///
    /// # Examples
    ///
    /// ```
    /// use formula_installer::descriptor::{BUNDLED_CSV_CONVERTER, PackageDescriptor};
    ///
    /// let formula = PackageDescriptor::from_toml_str(BUNDLED_CSV_CONVERTER).expect("valid");
    /// assert_eq!(formula.name().as_str(), "csv_converter");
    /// assert_eq!(formula.version(), "1.0.1");
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = toml::from_str(document)?;
        Self::from_raw(raw)
    }

    /// Read and validate a formula file.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Read`] if the file cannot be read, otherwise
    /// the errors of [`PackageDescriptor::from_toml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, DescriptorError> {
        let document = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_string(),
            source,
        })?;
        log::debug!("loaded formula from {path}");
        Self::from_toml_str(&document)
    }

    /// The bundled `csv_converter` formula.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled document is itself invalid.
    pub fn bundled() -> Result<Self, DescriptorError> {
        Self::from_toml_str(BUNDLED_CSV_CONVERTER)
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// Human-readable summary.
    #[must_use]
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Informational homepage URL.
    #[must_use]
    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    /// License identifier.
    #[must_use]
    pub fn license(&self) -> &str {
        &self.license
    }

    /// Version of the pinned source archive.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The pinned source archive.
    #[must_use]
    pub fn source(&self) -> &SourceArchive {
        &self.source
    }

    /// The mutable head branch, if the formula declares one.
    #[must_use]
    pub fn head(&self) -> Option<&HeadSource> {
        self.head.as_ref()
    }

    /// Tools required while building.
    #[must_use]
    pub fn build_dependencies(&self) -> &[BuildDependency] {
        &self.build_dependencies
    }

    /// Ordered install procedure.
    #[must_use]
    pub fn install_procedure(&self) -> &[Step] {
        &self.install
    }

    /// Ordered smoke-test procedure.
    #[must_use]
    pub fn test_procedure(&self) -> &[Step] {
        &self.test
    }

    /// Compression format of the pinned archive.
    #[must_use]
    pub fn archive_format(&self) -> ArchiveFormat {
        self.format
    }
}

impl PackageDescriptor {
    /// Apply cross-field constraints to a parsed document.
    fn from_raw(raw: RawDescriptor) -> Result<Self, DescriptorError> {
        require_non_empty("desc", &raw.desc)?;
        require_non_empty("license", &raw.license)?;
        require_https("source.url", &raw.source.url)?;
        let format =
            ArchiveFormat::from_url(&raw.source.url).map_err(|e| invalid("source.url", e))?;

        let version = match raw.version {
            Some(explicit) => {
                require_non_empty("version", &explicit)?;
                let well_formed = !explicit.starts_with('.')
                    && explicit
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'));
                if !well_formed {
                    return Err(invalid("version", format!("\"{explicit}\" is not a version")));
                }
                explicit
            }
            None => version_from_url(&raw.source.url).map_err(|e| invalid("version", e))?,
        };

        if let Some(head) = &raw.head {
            require_non_empty("head.url", &head.url)?;
            require_non_empty("head.branch", &head.branch)?;
        }

        for dependency in &raw.build_dependencies {
            require_non_empty("build_dependencies.name", &dependency.name)?;
            if dependency.probe.as_ref().is_some_and(Vec::is_empty) {
                return Err(invalid("build_dependencies.probe", "probe command is empty"));
            }
        }

        check_steps("install", &raw.install)?;
        check_steps("test", &raw.test)?;

        Ok(Self {
            name: raw.name,
            desc: raw.desc,
            homepage: raw.homepage,
            license: raw.license,
            version,
            source: raw.source,
            format,
            head: raw.head,
            build_dependencies: raw.build_dependencies,
            install: raw.install,
            test: raw.test,
        })
    }
}

fn invalid(field: &'static str, reason: impl fmt::Display) -> DescriptorError {
    DescriptorError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), DescriptorError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

fn require_https(field: &'static str, url: &str) -> Result<(), DescriptorError> {
    let host = url.strip_prefix("https://").unwrap_or_default();
    if host.is_empty() {
        return Err(invalid(field, format!("expected an https:// URL, got \"{url}\"")));
    }
    Ok(())
}

fn check_steps(field: &'static str, steps: &[Step]) -> Result<(), DescriptorError> {
    if steps.is_empty() {
        return Err(invalid(field, "at least one step is required"));
    }
    for step in steps {
        require_non_empty(field, &step.program)?;
        check_program(&step.program).map_err(|e| invalid(field, e))?;
        for arg in &step.args {
            check_arg(arg).map_err(|e| invalid(field, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
