//! Build dependency resolution.
//!
//! Every formula lists the tools it needs only while building. Each tool is
//! probed by running a cheap command (usually `<tool> --version`) through a
//! [`CommandExecutor`]; the first probe that fails to spawn or exits
//! unsuccessfully aborts the installation before any install step runs.

use crate::descriptor::BuildDependency;
use crate::error::{InstallerError, Result};
use camino::Utf8Path;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// When `cwd` is given the command runs in that directory, otherwise in
    /// the current one.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use formula_installer::deps::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("cargo", &["--version"], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), formula_installer::error::InstallerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir.as_std_path());
        }
        log::trace!("spawning {cmd} {}", args.join(" "));
        command.output().map_err(InstallerError::from)
    }
}

/// Checks that every build dependency is available.
///
/// Dependencies are probed in declaration order and probing stops at the
/// first missing tool.
///
/// # Errors
///
/// Returns [`InstallerError::DependencyMissing`] naming the first tool whose
/// probe could not be spawned or exited unsuccessfully, together with the
/// formula's remediation hint.
///
/// # Examples
///
/// ```no_run
/// use formula_installer::deps::{SystemCommandExecutor, resolve_build_dependencies};
/// use formula_installer::descriptor::PackageDescriptor;
///
/// let formula = PackageDescriptor::bundled()?;
/// resolve_build_dependencies(&SystemCommandExecutor, formula.build_dependencies())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn resolve_build_dependencies(
    executor: &dyn CommandExecutor,
    dependencies: &[BuildDependency],
) -> Result<()> {
    for dependency in dependencies {
        let (program, args) = dependency.probe_command();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if !probe_succeeds(executor, &program, &args) {
            log::debug!("build dependency {} not resolved", dependency.name);
            return Err(InstallerError::DependencyMissing {
                tool: dependency.name.clone(),
                hint: dependency.hint_or_default(),
            });
        }
        log::debug!("build dependency {} resolved via {program}", dependency.name);
    }
    Ok(())
}

/// Returns true if the given command executes successfully.
fn probe_succeeds(executor: &dyn CommandExecutor, cmd: &str, args: &[&str]) -> bool {
    match executor.run(cmd, args, None) {
        Ok(output) => output.status.success(),
        Err(err) => {
            log::trace!("probe {cmd} failed to run: {err}");
            false
        }
    }
}
