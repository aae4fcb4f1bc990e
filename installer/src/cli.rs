//! CLI argument definitions for the formula installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};

/// Fetch, verify, build, install and smoke-test packages from formulae.
#[derive(Parser, Debug)]
#[command(name = "formula-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Fetch, verify, build, install and smoke-test packages from formulae.\n\n",
    "A formula pins a source archive by URL and SHA-256 checksum, lists the tools ",
    "needed only while building, and declares the install and smoke-test steps. ",
    "The installer runs validate, resolve-dependencies, install and smoke-test in ",
    "that order and stops at the first failure.\n\n",
    "Without a FORMULA argument the bundled csv_converter formula is used.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the bundled csv_converter formula:\n",
    "    $ formula-installer\n\n",
    "  Install from a formula file into a custom root:\n",
    "    $ formula-installer --root /opt/formula install widget.toml\n\n",
    "  Build the unverified tip of the head branch:\n",
    "    $ formula-installer install --head\n\n",
    "  Download and verify the source archive only:\n",
    "    $ formula-installer fetch\n\n",
    "  List installed packages:\n",
    "    $ formula-installer list\n\n",
    "  Preview without downloading or building:\n",
    "    $ formula-installer install --dry-run",
))]
pub struct Cli {
    /// Subcommand to execute (defaults to `install`).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch, verify, build, install and smoke-test a package.
    Install(InstallArgs),

    /// Download the source archive and verify its checksum.
    Fetch(FormulaArgs),

    /// Re-run the smoke test against the installed package.
    Test(FormulaArgs),

    /// Show formula metadata.
    Info(InfoArgs),

    /// List installed packages.
    List(ListArgs),

    /// Remove installed versions of a package.
    Uninstall(UninstallArgs),
}

/// Options shared by every subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Installation root [default: platform-specific, or $FORMULA_ROOT].
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors and warnings still shown).
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Selects a formula file, defaulting to the bundled one.
#[derive(Parser, Debug, Clone, Default)]
pub struct FormulaArgs {
    /// Formula file [default: bundled csv_converter formula].
    #[arg(value_name = "FORMULA")]
    pub formula: Option<Utf8PathBuf>,
}

impl FormulaArgs {
    /// The formula path, if one was given.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.formula.as_deref()
    }
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Formula selection.
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Build the tip of the head branch instead of the pinned archive.
    #[arg(long)]
    pub head: bool,

    /// Reinstall even when the same version is already installed.
    #[arg(long)]
    pub force: bool,

    /// Show the plan and exit without downloading or building.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep the staging directory after the run for inspection.
    #[arg(long)]
    pub keep_staging: bool,
}

/// Arguments for the info command.
#[derive(Parser, Debug, Clone, Default)]
pub struct InfoArgs {
    /// Formula selection.
    #[command(flatten)]
    pub formula: FormulaArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ListArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the uninstall command.
#[derive(Parser, Debug, Clone)]
pub struct UninstallArgs {
    /// Package name.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Remove only this version [default: every installed version].
    #[arg(value_name = "VERSION")]
    pub version: Option<String>,
}

impl Cli {
    /// Returns the effective command.
    ///
    /// Without a subcommand the installer behaves as `install` with default
    /// arguments.
    #[must_use]
    pub fn effective_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Install(InstallArgs::default()))
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
