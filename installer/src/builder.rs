//! Install procedure execution.
//!
//! This module expands each install step against the keg layout and runs it
//! in the extracted source root. Steps run strictly in order and the first
//! failure aborts the rest.

use crate::deps::CommandExecutor;
use crate::descriptor::Step;
use crate::error::{InstallerError, Result};
use crate::template::{TemplateContext, expand_args, expand_program};
use camino::Utf8Path;
use std::fmt;
use std::process::Output;

/// A step with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedCommand {
    /// Program to run.
    pub program: String,
    /// Arguments to pass.
    pub args: Vec<String>,
}

impl ExpandedCommand {
    /// Expand `step` against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Template`] if the step references an
    /// unknown placeholder.
    pub fn expand(step: &Step, context: &TemplateContext<'_>) -> Result<Self> {
        Ok(Self {
            program: expand_program(&step.program, context)?,
            args: expand_args(&step.args, context)?,
        })
    }

    /// Run through `executor`, optionally inside `cwd`.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if the command cannot be spawned.
    pub fn run(&self, executor: &dyn CommandExecutor, cwd: Option<&Utf8Path>) -> Result<Output> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        executor.run(&self.program, &args, cwd)
    }
}

impl fmt::Display for ExpandedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Combine captured stdout and stderr for error reports.
///
/// Both streams are kept verbatim; stdout comes first.
#[must_use]
pub fn captured_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

/// Runs the install procedure in `source_root`.
///
/// # Errors
///
/// Returns [`InstallerError::BuildFailed`] carrying the one-based index of
/// the first failing step, its expanded command line, and its output.
/// Spawn failures are reported the same way.
pub fn run_install_procedure(
    executor: &dyn CommandExecutor,
    steps: &[Step],
    context: &TemplateContext<'_>,
    source_root: &Utf8Path,
) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        let number = index + 1;
        let command = ExpandedCommand::expand(step, context)?;
        log::info!("install step {number}/{}: {command}", steps.len());

        let output = match command.run(executor, Some(source_root)) {
            Ok(output) => output,
            Err(InstallerError::Io(err)) => {
                return Err(InstallerError::BuildFailed {
                    step: number,
                    command: command.to_string(),
                    status: "spawn failure".to_owned(),
                    output: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        };

        if !output.status.success() {
            return Err(InstallerError::BuildFailed {
                step: number,
                command: command.to_string(),
                status: output.status.to_string(),
                output: captured_output(&output),
            });
        }
    }
    Ok(())
}
