//! Unit tests for install pipeline orchestration.
//!
//! The fetcher serves an in-memory tarball, extraction is real, and every
//! external command goes through a `StubExecutor`, so these tests exercise
//! phase ordering, rollback, and receipts without network or toolchain.

use super::*;
use crate::archive::download::DownloadError;
use crate::git::MockHeadCloner;
use crate::test_utils::{
    ExpectedCall, StubExecutor, failure_output, sha256_of, stdout_output, success_output, tar_gz,
};
use rstest::{fixture, rstest};
use std::cell::Cell;
use std::path::Path;
use std::process::Output;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const URL: &str = "https://example.test/widget-2.1.0.tar.gz";

/// Serves fixed bytes for every fetch.
struct BytesFetcher {
    bytes: Vec<u8>,
    calls: Cell<usize>,
}

impl SourceFetcher for BytesFetcher {
    fn fetch(&self, _url: &str, dest: &Path) -> std::result::Result<(), DownloadError> {
        self.calls.set(self.calls.get() + 1);
        std::fs::write(dest, &self.bytes)?;
        Ok(())
    }
}

fn formula(sha256: &str, with_head: bool) -> PackageDescriptor {
    let head = if with_head {
        "[head]\nurl = \"https://example.test/widget.git\"\n"
    } else {
        ""
    };
    let document = format!(
        r#"
name = "widget"
desc = "Makes widgets"
homepage = "https://example.test/widget"
license = "MIT"

[source]
url = "{URL}"
sha256 = "{sha256}"

{head}
[[build_dependencies]]
name = "rust"

[[install]]
program = "cargo"
args = ["install", "{{std_cargo_args}}"]

[[test]]
program = "{{bin}}/widget"
args = ["--version"]
"#
    );
    PackageDescriptor::from_toml_str(&document).expect("valid test formula")
}

struct Fixture {
    _temp: TempDir,
    cellar: Cellar,
    fetcher: BytesFetcher,
    descriptor: PackageDescriptor,
}

impl Fixture {
    fn keg(&self) -> Utf8PathBuf {
        self.cellar.keg_path("widget", "2.1.0")
    }

    fn install_call(&self) -> ExpectedCall {
        let keg = self.keg();
        ExpectedCall::new(
            "cargo",
            &["install", "--locked", "--root", keg.as_str(), "--path", "."],
            Ok(success_output()),
        )
    }

    fn smoke_call(&self, output: std::process::Output) -> ExpectedCall {
        let binary = self.keg().join("bin/widget");
        ExpectedCall::new(binary.as_str(), &["--version"], Ok(output))
    }

    fn tools<'a>(&'a self, executor: &'a StubExecutor, cloner: &'a MockHeadCloner) -> Toolbox<'a> {
        Toolbox {
            fetcher: &self.fetcher,
            extractor: &TarExtractor,
            cloner,
            executor,
        }
    }
}

#[fixture]
fn fixture() -> Fixture {
    let archive = tar_gz(
        "widget-2.1.0",
        &[
            ("Cargo.toml", b"[package]\nname = \"widget\"\n".as_slice()),
            ("src/main.rs", b"fn main() {}\n".as_slice()),
        ],
    );
    let digest = sha256_of(&archive);
    let temp = TempDir::new().expect("failed to create temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
    Fixture {
        _temp: temp,
        cellar: Cellar::new(root),
        fetcher: BytesFetcher {
            bytes: archive,
            calls: Cell::new(0),
        },
        descriptor: formula(digest.as_str(), true),
    }
}

fn probe_ok() -> ExpectedCall {
    ExpectedCall::new("cargo", &["--version"], Ok(success_output()))
}

#[rstest]
fn matching_checksum_installs_and_records_receipt(fixture: Fixture) {
    let executor = StubExecutor::new(vec![
        probe_ok(),
        fixture.install_call(),
        fixture.smoke_call(stdout_output("widget 2.1.0\n")),
    ]);
    let cloner = MockHeadCloner::new();
    let mut stderr = Vec::new();

    let outcome = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&executor, &cloner),
        &mut stderr,
    )
    .expect("install succeeds");

    executor.assert_finished();
    match outcome {
        InstallOutcome::Installed {
            keg,
            receipt,
            smoke_output,
        } => {
            assert_eq!(keg, fixture.keg());
            assert!(receipt.verified);
            assert!(!receipt.head);
            assert_eq!(receipt.sha256, Some(fixture.descriptor.source().sha256.clone()));
            assert_eq!(smoke_output, "widget 2.1.0");
            assert!(InstallReceipt::path_in(&keg).is_file());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let install = executor
        .invocations()
        .into_iter()
        .find(|call| call.args.first().map(String::as_str) == Some("install"))
        .expect("install step ran");
    let cwd = install.cwd.expect("install runs in source root");
    assert!(cwd.ends_with("widget-2.1.0"));

    let progress = String::from_utf8(stderr).expect("utf8");
    assert!(progress.contains("Verified SHA-256"));
}

#[rstest]
fn corrupted_checksum_aborts_before_any_command(fixture: Fixture) {
    let descriptor = formula(&"0".repeat(64), false);
    let executor = StubExecutor::new(Vec::new());
    let cloner = MockHeadCloner::new();

    let err = install_package_with(
        &descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&executor, &cloner),
        &mut Vec::new(),
    )
    .expect_err("checksum mismatch");

    match err {
        InstallerError::ChecksumMismatch { url, expected, actual } => {
            assert_eq!(url, URL);
            assert_eq!(expected.as_str(), "0".repeat(64));
            assert_eq!(actual, fixture.descriptor.source().sha256);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(executor.invocations().is_empty());
    assert!(!fixture.keg().exists());
}

#[rstest]
fn missing_dependency_runs_no_install_step(fixture: Fixture) {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "cargo",
        &["--version"],
        Ok(failure_output("command not found")),
    )]);
    let cloner = MockHeadCloner::new();

    let err = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&executor, &cloner),
        &mut Vec::new(),
    )
    .expect_err("rust missing");

    assert!(matches!(err, InstallerError::DependencyMissing { ref tool, .. } if tool == "rust"));
    assert_eq!(executor.invocations().len(), 1);
    assert!(!fixture.keg().exists());
}

#[rstest]
fn build_failure_skips_smoke_test_and_removes_keg(fixture: Fixture) {
    let keg = fixture.keg();
    let executor = StubExecutor::new(vec![
        probe_ok(),
        ExpectedCall::new(
            "cargo",
            &["install", "--locked", "--root", keg.as_str(), "--path", "."],
            Ok(failure_output("error: could not compile `widget`")),
        ),
    ]);
    let cloner = MockHeadCloner::new();

    let err = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&executor, &cloner),
        &mut Vec::new(),
    )
    .expect_err("build fails");

    match err {
        InstallerError::BuildFailed { step, output, .. } => {
            assert_eq!(step, 1);
            assert_eq!(output, "error: could not compile `widget`");
        }
        other => panic!("unexpected error: {other}"),
    }
    executor.assert_finished();
    assert!(!keg.exists());
}

#[rstest]
fn smoke_test_failure_rolls_back_keg(fixture: Fixture) {
    let executor = StubExecutor::new(vec![
        probe_ok(),
        fixture.install_call(),
        fixture.smoke_call(failure_output("Illegal instruction")),
    ]);
    let cloner = MockHeadCloner::new();

    let err = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&executor, &cloner),
        &mut Vec::new(),
    )
    .expect_err("smoke test fails");

    assert!(matches!(err, InstallerError::VerificationFailed { .. }));
    assert!(!fixture.keg().exists());
    assert!(!fixture.cellar.rack_path("widget").exists());
}

#[rstest]
fn reinstall_is_skipped_unless_forced(fixture: Fixture) {
    let cloner = MockHeadCloner::new();
    let first = StubExecutor::new(vec![
        probe_ok(),
        fixture.install_call(),
        fixture.smoke_call(success_output()),
    ]);
    install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&first, &cloner),
        &mut Vec::new(),
    )
    .expect("first install");

    let idle = StubExecutor::new(Vec::new());
    let outcome = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&idle, &cloner),
        &mut Vec::new(),
    )
    .expect("second install");
    assert!(matches!(outcome, InstallOutcome::AlreadyInstalled { .. }));
    assert_eq!(fixture.fetcher.calls.get(), 1);

    let forced = StubExecutor::new(vec![
        probe_ok(),
        fixture.install_call(),
        fixture.smoke_call(success_output()),
    ]);
    let outcome = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions {
            force: true,
            ..InstallOptions::default()
        },
        fixture.tools(&forced, &cloner),
        &mut Vec::new(),
    )
    .expect("forced install");
    assert!(matches!(outcome, InstallOutcome::Installed { .. }));
    forced.assert_finished();
    assert_eq!(fixture.fetcher.calls.get(), 2);
}

#[rstest]
fn failed_forced_reinstall_keeps_previous_keg(fixture: Fixture) {
    let cloner = MockHeadCloner::new();
    let first = StubExecutor::new(vec![
        probe_ok(),
        fixture.install_call(),
        fixture.smoke_call(success_output()),
    ]);
    install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        fixture.tools(&first, &cloner),
        &mut Vec::new(),
    )
    .expect("first install");
    let keg = fixture.keg();
    std::fs::write(keg.join("bin/widget"), b"working build").expect("write binary");
    let before = InstallReceipt::read(&keg)
        .expect("readable receipt")
        .expect("receipt present");

    let forced = StubExecutor::new(vec![
        probe_ok(),
        ExpectedCall::new(
            "cargo",
            &["install", "--locked", "--root", keg.as_str(), "--path", "."],
            Ok(failure_output("error: could not compile `widget`")),
        ),
    ]);
    let err = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions {
            force: true,
            ..InstallOptions::default()
        },
        fixture.tools(&forced, &cloner),
        &mut Vec::new(),
    )
    .expect_err("rebuild fails");

    assert!(matches!(err, InstallerError::BuildFailed { .. }));
    assert_eq!(
        std::fs::read(keg.join("bin/widget")).expect("binary survives"),
        b"working build"
    );
    let after = InstallReceipt::read(&keg)
        .expect("readable receipt")
        .expect("receipt survives");
    assert_eq!(after, before);
    let leftovers: Vec<_> = fixture
        .cellar
        .rack_path("widget")
        .read_dir_utf8()
        .expect("rack readable")
        .map(|entry| entry.expect("rack entry").file_name().to_owned())
        .collect();
    assert_eq!(leftovers, ["2.1.0"]);
}

#[rstest]
fn successful_forced_reinstall_leaves_no_parked_keg(fixture: Fixture) {
    let cloner = MockHeadCloner::new();
    for force in [false, true] {
        let executor = StubExecutor::new(vec![
            probe_ok(),
            fixture.install_call(),
            fixture.smoke_call(success_output()),
        ]);
        install_package_with(
            &fixture.descriptor,
            &fixture.cellar,
            InstallOptions {
                force,
                ..InstallOptions::default()
            },
            fixture.tools(&executor, &cloner),
            &mut Vec::new(),
        )
        .expect("install succeeds");
    }

    let entries: Vec<_> = fixture
        .cellar
        .rack_path("widget")
        .read_dir_utf8()
        .expect("rack readable")
        .map(|entry| entry.expect("rack entry").file_name().to_owned())
        .collect();
    assert_eq!(entries, ["2.1.0"]);
}

/// Delegates to a `StubExecutor`, stalling the install step and noting when
/// the smoke test starts.
struct SlowBuildExecutor {
    inner: StubExecutor,
    smoke_started: Cell<Option<u64>>,
}

impl CommandExecutor for SlowBuildExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Utf8Path>) -> Result<Output> {
        if args.first() == Some(&"install") {
            std::thread::sleep(Duration::from_millis(1100));
        }
        if cmd.ends_with("bin/widget") {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock after epoch")
                .as_secs();
            self.smoke_started.set(Some(now));
        }
        self.inner.run(cmd, args, cwd)
    }
}

#[rstest]
fn receipt_is_stamped_after_the_smoke_test(fixture: Fixture) {
    let executor = SlowBuildExecutor {
        inner: StubExecutor::new(vec![
            probe_ok(),
            fixture.install_call(),
            fixture.smoke_call(success_output()),
        ]),
        smoke_started: Cell::new(None),
    };
    let cloner = MockHeadCloner::new();
    let tools = Toolbox {
        fetcher: &fixture.fetcher,
        extractor: &TarExtractor,
        cloner: &cloner,
        executor: &executor,
    };

    let outcome = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions::default(),
        tools,
        &mut Vec::new(),
    )
    .expect("install succeeds");

    let smoke_started = executor.smoke_started.get().expect("smoke test ran");
    match outcome {
        InstallOutcome::Installed { receipt, .. } => {
            assert!(
                receipt.installed_at >= smoke_started,
                "stamped at {} before smoke test at {smoke_started}",
                receipt.installed_at
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[rstest]
fn head_build_clones_and_records_unverified_receipt(fixture: Fixture) {
    let head_keg = fixture.cellar.keg_path("widget", HEAD_VERSION);
    let executor = StubExecutor::new(vec![
        probe_ok(),
        ExpectedCall::new(
            "cargo",
            &["install", "--locked", "--root", head_keg.as_str(), "--path", "."],
            Ok(success_output()),
        ),
        ExpectedCall::new(head_keg.join("bin/widget").as_str(), &["--version"], Ok(success_output())),
    ]);
    let mut cloner = MockHeadCloner::new();
    cloner
        .expect_clone_head()
        .withf(|head, _| head.url == "https://example.test/widget.git" && head.branch == "main")
        .times(1)
        .returning(|_, dest| {
            std::fs::create_dir_all(dest)?;
            Ok(())
        });
    let mut stderr = Vec::new();

    let outcome = install_package_with(
        &fixture.descriptor,
        &fixture.cellar,
        InstallOptions {
            head: true,
            quiet: true,
            ..InstallOptions::default()
        },
        fixture.tools(&executor, &cloner),
        &mut stderr,
    )
    .expect("head install");

    match outcome {
        InstallOutcome::Installed { receipt, .. } => {
            assert!(receipt.head);
            assert!(!receipt.verified);
            assert_eq!(receipt.sha256, None);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(fixture.fetcher.calls.get(), 0);

    let stderr = String::from_utf8(stderr).expect("utf8");
    assert!(stderr.contains("not verified"), "warning survives --quiet: {stderr}");
    assert!(!stderr.contains("Cloning"), "progress is quiet: {stderr}");
}

#[rstest]
fn head_build_without_head_source_is_rejected(fixture: Fixture) {
    let descriptor = formula(fixture.descriptor.source().sha256.as_str(), false);
    let executor = StubExecutor::new(Vec::new());
    let cloner = MockHeadCloner::new();

    let err = install_package_with(
        &descriptor,
        &fixture.cellar,
        InstallOptions {
            head: true,
            ..InstallOptions::default()
        },
        fixture.tools(&executor, &cloner),
        &mut Vec::new(),
    )
    .expect_err("no head");
    assert!(matches!(err, InstallerError::NoHeadSource { .. }));
}

#[rstest]
fn fetch_reports_verified_digest(fixture: Fixture) {
    let executor = StubExecutor::new(Vec::new());
    let cloner = MockHeadCloner::new();
    let digest = fetch_package_with(
        &fixture.descriptor,
        true,
        fixture.tools(&executor, &cloner),
        &mut Vec::new(),
    )
    .expect("fetch succeeds");
    assert_eq!(digest, fixture.descriptor.source().sha256);
}

#[rstest]
fn smoke_test_of_missing_package_is_not_installed(fixture: Fixture) {
    let executor = StubExecutor::new(Vec::new());
    let cloner = MockHeadCloner::new();
    let err = test_installed_with(
        &fixture.descriptor,
        &fixture.cellar,
        fixture.tools(&executor, &cloner),
    )
    .expect_err("nothing installed");
    assert!(matches!(err, InstallerError::NotInstalled { .. }));
}
