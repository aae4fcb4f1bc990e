//! Git operations for unpinned head builds.
//!
//! A head build clones the tip of the formula's declared branch instead of
//! fetching the pinned archive. Clones are shallow and have a timeout to
//! prevent hangs on network issues.

use crate::descriptor::HeadSource;
use crate::error::{InstallerError, Result};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for git operations (5 minutes).
const GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Trait for obtaining head-branch sources.
#[cfg_attr(test, mockall::automock)]
pub trait HeadCloner {
    /// Clone the tip of `head` into `dest`, which must not yet exist.
    ///
    /// # Errors
    ///
    /// Returns `InstallerError::Git` if the clone fails or times out.
    fn clone_head(&self, head: &HeadSource, dest: &Path) -> Result<()>;
}

/// Clones with the `git` binary found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCloner;

impl HeadCloner for GitCloner {
    fn clone_head(&self, head: &HeadSource, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let args = clone_args(head, &dest_str);
        log::debug!("git {}", args.join(" "));
        let output = run_git_with_timeout(&args, "clone")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InstallerError::Git {
                operation: "clone",
                message: stderr.trim().to_owned(),
            });
        }

        Ok(())
    }
}

/// Arguments for a shallow single-branch clone.
fn clone_args<'a>(head: &'a HeadSource, dest: &'a str) -> Vec<&'a str> {
    vec![
        "clone",
        "--depth",
        "1",
        "--branch",
        head.branch.as_str(),
        head.url.as_str(),
        dest,
    ]
}

/// Runs a git command with a timeout.
///
/// Returns the command output if it completes within the timeout, or an error
/// if the command times out or fails to start.
fn run_git_with_timeout(args: &[&str], operation: &'static str) -> Result<Output> {
    let mut child = Command::new("git")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| InstallerError::Git {
            operation,
            message: format!("cannot run git: {err}"),
        })?;

    if let Some(status) = child.wait_timeout(GIT_TIMEOUT)? {
        let stdout = child
            .stdout
            .take()
            .map(std::io::read_to_string)
            .transpose()?
            .unwrap_or_default();
        let stderr = child
            .stderr
            .take()
            .map(std::io::read_to_string)
            .transpose()?
            .unwrap_or_default();

        return Ok(Output {
            status,
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        });
    }

    let _ = child.kill();
    let _ = child.wait();
    Err(InstallerError::Git {
        operation,
        message: format!(
            "operation timed out after {} seconds",
            GIT_TIMEOUT.as_secs()
        ),
    })
}
