//! Formula installer CLI entrypoint.
//!
//! This binary fetches, verifies, builds, installs, and smoke-tests packages
//! described by formulae. After installation, it prints shell configuration
//! snippets when the keg's `bin` directory is not yet on `PATH`.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use formula_installer::cellar::{Cellar, determine_root};
use formula_installer::cli::{Cli, Command, FormulaArgs, InstallArgs};
use formula_installer::descriptor::{HEAD_VERSION, PackageDescriptor};
use formula_installer::dirs::SystemBaseDirs;
use formula_installer::error::{InstallerError, Result};
use formula_installer::list::run_list;
use formula_installer::output::{
    DryRunInfo, ShellSnippet, info_json, info_text, is_directory_in_path, success_message,
    write_stderr_line,
};
use formula_installer::pipeline::{
    InstallOptions, InstallOutcome, Toolbox, fetch_package, install_package, test_installed_with,
};
use formula_installer::uninstall::run_uninstall;
use log::LevelFilter;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbosity);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the `env_logger` backend; `RUST_LOG` overrides the `-v` count.
fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for(verbosity))
        .format_timestamp(None)
        .parse_default_env();
    if let Err(err) = builder.try_init() {
        log::debug!("keeping existing logger: {err}");
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let quiet = cli.global.quiet;
    match cli.effective_command() {
        Command::Install(args) => run_install(cli, &args, stderr),
        Command::Fetch(args) => {
            let descriptor = load_formula(&args)?;
            let digest = fetch_package(&descriptor, quiet, stderr)?;
            write_stdout_line(stdout, format!("{digest}  {}", descriptor.source().url))
        }
        Command::Test(args) => {
            let descriptor = load_formula(&args)?;
            let cellar = Cellar::new(resolve_root(cli)?);
            let (keg, output) = test_installed_with(&descriptor, &cellar, Toolbox::system())?;
            if !quiet {
                write_stderr_line(stderr, format!("Smoke test passed for {keg}"));
            }
            write_stdout_line(stdout, output)
        }
        Command::Info(args) => {
            let descriptor = load_formula(&args.formula)?;
            let text = if args.json {
                info_json(&descriptor)
            } else {
                info_text(&descriptor)
            };
            write_stdout_line(stdout, text)
        }
        Command::List(args) => run_list(&args, &resolve_root(cli)?, stdout),
        Command::Uninstall(args) => {
            let cellar = Cellar::new(resolve_root(cli)?);
            run_uninstall(&args, &cellar, stdout).map(|_| ())
        }
    }
}

/// Runs the full install pipeline, or prints the plan with `--dry-run`.
fn run_install(cli: &Cli, args: &InstallArgs, stderr: &mut dyn Write) -> Result<()> {
    let descriptor = load_formula(&args.formula)?;
    let cellar = Cellar::new(resolve_root(cli)?);

    if args.dry_run {
        write_stderr_line(stderr, dry_run_text(&descriptor, &cellar, args)?);
        return Ok(());
    }

    let options = InstallOptions {
        head: args.head,
        force: args.force,
        keep_staging: args.keep_staging,
        quiet: cli.global.quiet,
    };

    match install_package(&descriptor, &cellar, options, stderr)? {
        InstallOutcome::Installed {
            keg,
            receipt,
            smoke_output,
        } => {
            if !cli.global.quiet {
                write_stderr_line(stderr, "");
                if !smoke_output.is_empty() {
                    write_stderr_line(stderr, format!("Smoke test: {smoke_output}"));
                }
                write_stderr_line(
                    stderr,
                    success_message(&receipt.name, &receipt.version, &keg),
                );
            }
            report_path(&keg.join("bin"), stderr);
        }
        InstallOutcome::AlreadyInstalled { keg, receipt } => {
            write_stderr_line(
                stderr,
                format!(
                    "{} {} is already installed at {keg}; pass --force to reinstall",
                    receipt.name, receipt.version
                ),
            );
        }
    }

    Ok(())
}

fn dry_run_text(
    descriptor: &PackageDescriptor,
    cellar: &Cellar,
    args: &InstallArgs,
) -> Result<String> {
    let name = descriptor.name().as_str();
    let (version, source, checksum) = if args.head {
        let head = descriptor
            .head()
            .ok_or_else(|| InstallerError::NoHeadSource {
                name: name.to_owned(),
            })?;
        (HEAD_VERSION, head.url.as_str(), None)
    } else {
        (
            descriptor.version(),
            descriptor.source().url.as_str(),
            Some(descriptor.source().sha256.as_str()),
        )
    };
    let keg = cellar.keg_path(name, version);

    let info = DryRunInfo {
        name,
        version,
        source,
        checksum,
        keg: &keg,
        force: args.force || args.head,
        build_dependencies: descriptor.build_dependencies(),
        install: descriptor.install_procedure(),
        test: descriptor.test_procedure(),
    };
    Ok(info.display_text())
}

/// Prints shell snippets when `bin_dir` is not already on `PATH`.
fn report_path(bin_dir: &Utf8Path, stderr: &mut dyn Write) {
    if is_directory_in_path(bin_dir) {
        return;
    }
    write_stderr_line(stderr, "");
    write_stderr_line(stderr, ShellSnippet::new(bin_dir).display_text());
}

/// Loads the given formula file, or the bundled one.
fn load_formula(args: &FormulaArgs) -> Result<PackageDescriptor> {
    let descriptor = match args.path() {
        Some(path) => PackageDescriptor::load(path)?,
        None => PackageDescriptor::bundled()?,
    };
    log::debug!(
        "using formula {} {}",
        descriptor.name(),
        descriptor.version()
    );
    Ok(descriptor)
}

/// Resolves the installation root from `--root`, `FORMULA_ROOT`, or the
/// platform data directory.
fn resolve_root(cli: &Cli) -> Result<Utf8PathBuf> {
    let cli_root = cli.global.root.as_deref();
    match SystemBaseDirs::new() {
        Some(dirs) => determine_root(cli_root, &dirs),
        None => cli_root
            .map(Utf8Path::to_owned)
            .ok_or_else(|| InstallerError::StagingFailed {
                reason: "no home directory found; pass --root".to_owned(),
            }),
    }
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) -> Result<()> {
    writeln!(stdout, "{message}").map_err(|e| InstallerError::WriteFailed { source: e })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}: {err}", err.phase()));
            1
        }
    }
}
