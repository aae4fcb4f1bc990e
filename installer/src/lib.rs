//! Formula installer library.
//!
//! This crate fetches a package's pinned source archive, verifies its SHA-256
//! digest, checks build-time tools, runs the formula's install steps into a
//! versioned keg, and smoke-tests the result. It is used by the
//! `formula-installer` CLI binary and can be consumed programmatically for
//! testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`archive`] - Source archive download, checksum, and extraction
//! - [`builder`] - Install step expansion and execution
//! - [`cellar`] - Keg layout under the installation root
//! - [`cli`] - Command-line argument definitions
//! - [`deps`] - Command execution and build dependency resolution
//! - [`descriptor`] - Formula model and loading
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types tagged with the failing phase
//! - [`git`] - Head branch cloning
//! - [`list`] - The `list` command
//! - [`list_output`] - Output formatting for package listing
//! - [`output`] - Progress lines, shell snippets, and plan formatting
//! - [`package_name`] - Validated package names
//! - [`pipeline`] - Install pipeline orchestration
//! - [`receipt`] - Install receipts
//! - [`scanner`] - Keg scanner for discovering installed packages
//! - [`smoke`] - Smoke-test execution
//! - [`template`] - Step placeholder expansion
//! - [`uninstall`] - The `uninstall` command

pub mod archive;
pub mod builder;
pub mod cellar;
pub mod cli;
pub mod deps;
pub mod descriptor;
pub mod dirs;
pub mod error;
pub mod git;
pub mod list;
pub mod list_output;
pub mod output;
pub mod package_name;
pub mod pipeline;
pub mod receipt;
pub mod scanner;
pub mod smoke;
pub mod template;
pub mod uninstall;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
