//! Post-install smoke test.
//!
//! The test procedure runs the freshly installed executable (for
//! `csv_converter`, `{bin}/csv_converter --version`). Success is exit code 0;
//! output content is not inspected.

use crate::builder::{ExpandedCommand, captured_output};
use crate::deps::CommandExecutor;
use crate::descriptor::Step;
use crate::error::{InstallerError, Result};
use crate::template::TemplateContext;

/// Runs every test step against the installed keg.
///
/// Returns the stdout of the last step, trimmed, for progress output.
///
/// # Errors
///
/// Returns [`InstallerError::VerificationFailed`] for the first step that
/// cannot be spawned or exits unsuccessfully. Rolling back the keg is the
/// caller's responsibility.
pub fn run_test_procedure(
    executor: &dyn CommandExecutor,
    steps: &[Step],
    context: &TemplateContext<'_>,
) -> Result<String> {
    let mut last_stdout = String::new();
    for step in steps {
        let command = ExpandedCommand::expand(step, context)?;
        log::info!("smoke test: {command}");

        let output = command
            .run(executor, Some(context.prefix))
            .map_err(|err| InstallerError::VerificationFailed {
                command: command.to_string(),
                status: "spawn failure".to_owned(),
                output: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(InstallerError::VerificationFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                output: captured_output(&output),
            });
        }
        last_stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    }
    Ok(last_stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, stdout_output};
    use camino::Utf8Path;

    fn version_check() -> Step {
        Step {
            program: "{bin}/csv_converter".to_owned(),
            args: vec!["--version".to_owned()],
        }
    }

    fn context(prefix: &Utf8Path) -> TemplateContext<'_> {
        TemplateContext {
            name: "csv_converter",
            version: "1.0.1",
            prefix,
        }
    }

    #[test]
    fn zero_exit_passes_and_reports_stdout() {
        let prefix = Utf8Path::new("/opt/formula/Cellar/csv_converter/1.0.1");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "/opt/formula/Cellar/csv_converter/1.0.1/bin/csv_converter",
            &["--version"],
            Ok(stdout_output("csv_converter 1.0.1\n")),
        )]);

        let reported = run_test_procedure(&executor, &[version_check()], &context(prefix))
            .expect("smoke test passes");

        assert_eq!(reported, "csv_converter 1.0.1");
        executor.assert_finished();
    }

    #[test]
    fn non_zero_exit_is_verification_failure() {
        let prefix = Utf8Path::new("/opt/formula/Cellar/csv_converter/1.0.1");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "/opt/formula/Cellar/csv_converter/1.0.1/bin/csv_converter",
            &["--version"],
            Ok(failure_output("Segmentation fault")),
        )]);

        let err = run_test_procedure(&executor, &[version_check()], &context(prefix))
            .expect_err("smoke test fails");

        match err {
            InstallerError::VerificationFailed { command, output, .. } => {
                assert!(command.ends_with("bin/csv_converter --version"));
                assert_eq!(output, "Segmentation fault");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_binary_is_verification_failure() {
        let prefix = Utf8Path::new("/opt/formula/Cellar/csv_converter/1.0.1");
        let executor = StubExecutor::new(vec![ExpectedCall::new(
            "/opt/formula/Cellar/csv_converter/1.0.1/bin/csv_converter",
            &["--version"],
            Err(std::io::Error::from(std::io::ErrorKind::NotFound).into()),
        )]);

        let err = run_test_procedure(&executor, &[version_check()], &context(prefix))
            .expect_err("binary missing");
        assert!(matches!(err, InstallerError::VerificationFailed { .. }));
    }
}
