//! List command implementation.
//!
//! This module provides the `run_list` command handler, which scans the
//! installation root for completed kegs and prints them.

use camino::Utf8Path;
use std::io::Write;

use crate::cli::ListArgs;
use crate::error::{InstallerError, Result};
use crate::list_output::{format_human, format_json};
use crate::scanner::scan_installed;

/// Lists installed packages under `root`.
///
/// Output is written to stdout (human-readable by default, JSON with `--json`).
///
/// # Errors
///
/// Returns an error if:
/// - The cellar cannot be scanned
/// - Writing to stdout fails
pub fn run_list(args: &ListArgs, root: &Utf8Path, stdout: &mut dyn Write) -> Result<()> {
    let installed = scan_installed(root).map_err(|e| InstallerError::ScanFailed { source: e })?;
    log::debug!("found {} installed package(s)", installed.by_package.len());

    let output = if args.json {
        format_json(&installed)
    } else {
        format_human(&installed)
    };

    writeln!(stdout, "{output}").map_err(|e| InstallerError::WriteFailed { source: e })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::sha256_digest::Sha256Digest;
    use crate::cellar::Cellar;
    use crate::receipt::InstallReceipt;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    /// A temporary directory converted to a UTF-8 path for test isolation.
    struct TempRoot {
        _temp: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn temp_root() -> TempRoot {
        let temp = TempDir::new().expect("failed to create temp dir");
        let path = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        TempRoot { _temp: temp, path }
    }

    /// A Write implementation that always fails, for testing error paths.
    struct FailingWriter;

    impl std::io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("simulated write failure"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("simulated flush failure"))
        }
    }

    fn install_mock_keg(root: &Utf8Path, version: &str) {
        let cellar = Cellar::new(root.to_owned());
        let keg = cellar
            .prepare_keg("csv_converter", version)
            .expect("failed to prepare keg");
        InstallReceipt::pinned(
            "csv_converter",
            version,
            "https://example.test/v1.0.1.tar.gz",
            Sha256Digest::try_from("c".repeat(64)).expect("valid digest"),
        )
        .write(&keg)
        .expect("failed to write receipt");
    }

    #[rstest]
    fn empty_root_reports_nothing_installed(temp_root: TempRoot) {
        let mut stdout = Vec::new();

        let result = run_list(&ListArgs { json: false }, &temp_root.path, &mut stdout);

        assert!(result.is_ok(), "expected success, got: {result:?}");
        let output = String::from_utf8_lossy(&stdout);
        assert!(output.contains("No packages installed"), "got: {output}");
    }

    #[rstest]
    #[case::json_format(true, &["\"packages\"", "\"1.0.1\""])]
    #[case::human_format(false, &["csv_converter", "1.0.1"])]
    fn installed_keg_appears_in_output(
        temp_root: TempRoot,
        #[case] json: bool,
        #[case] expected: &[&str],
    ) {
        install_mock_keg(&temp_root.path, "1.0.1");
        let mut stdout = Vec::new();

        let result = run_list(&ListArgs { json }, &temp_root.path, &mut stdout);

        assert!(result.is_ok(), "expected success, got: {result:?}");
        let output = String::from_utf8_lossy(&stdout);
        for needle in expected {
            assert!(
                output.contains(needle),
                "expected '{needle}' in output: {output}"
            );
        }
    }

    #[rstest]
    fn keg_without_receipt_is_not_listed(temp_root: TempRoot) {
        Cellar::new(temp_root.path.clone())
            .prepare_keg("csv_converter", "1.0.1")
            .expect("failed to prepare keg");
        let mut stdout = Vec::new();

        run_list(&ListArgs { json: false }, &temp_root.path, &mut stdout).expect("list succeeds");

        let output = String::from_utf8_lossy(&stdout);
        assert!(output.contains("No packages installed"), "got: {output}");
    }

    #[rstest]
    fn returns_write_failed_on_stdout_error(temp_root: TempRoot) {
        let mut failing_stdout = FailingWriter;

        let result = run_list(&ListArgs { json: false }, &temp_root.path, &mut failing_stdout);

        let err = result.expect_err("expected error on write failure");
        assert!(
            matches!(err, InstallerError::WriteFailed { .. }),
            "expected WriteFailed error, got: {err:?}"
        );
    }
}
