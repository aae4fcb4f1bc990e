//! Output formatting for the installer CLI.
//!
//! This module provides the progress-line helper, shell snippets that put an
//! installed keg's `bin` directory on `PATH`, the success message, and
//! dry-run plan formatting.

use crate::descriptor::{BuildDependency, PackageDescriptor, Step};
use camino::Utf8Path;
use std::io::Write;

/// Write one progress line to `stderr`.
///
/// Write failures are ignored; progress output is best-effort.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Shell configuration snippets for different shells.
#[derive(Debug, Clone)]
pub struct ShellSnippet {
    /// Export line for bash/zsh.
    pub bash: String,
    /// Path line for fish shell.
    pub fish: String,
    /// Assignment line for PowerShell.
    pub powershell: String,
}

impl ShellSnippet {
    /// Create shell snippets adding `bin_dir` to `PATH`.
    ///
    /// # Example
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use formula_installer::output::ShellSnippet;
    ///
    /// let bin = Utf8PathBuf::from("/home/user/.local/share/formula/Cellar/csv_converter/1.0.1/bin");
    /// let snippet = ShellSnippet::new(&bin);
    ///
    /// assert!(snippet.bash.starts_with("export PATH="));
    /// ```
    #[must_use]
    pub fn new(bin_dir: &Utf8Path) -> Self {
        Self {
            bash: format!("export PATH=\"{bin_dir}:$PATH\""),
            fish: format!("fish_add_path \"{bin_dir}\""),
            powershell: format!("$env:PATH = \"{bin_dir};$env:PATH\""),
        }
    }

    /// Format the snippet for display to the user.
    #[must_use]
    pub fn display_text(&self) -> String {
        format!(
            concat!(
                "Add the following to your shell configuration:\n\n",
                "  # bash/zsh (~/.bashrc, ~/.zshrc)\n",
                "  {}\n\n",
                "  # fish (~/.config/fish/config.fish)\n",
                "  {}\n\n",
                "  # PowerShell ($PROFILE)\n",
                "  {}"
            ),
            self.bash, self.fish, self.powershell
        )
    }
}

/// Checks if a directory is in the PATH environment variable.
#[must_use]
pub fn is_directory_in_path(dir: &Utf8Path) -> bool {
    std::env::var_os("PATH")
        .is_some_and(|path| std::env::split_paths(&path).any(|p| p == dir.as_std_path()))
}

/// Format a success message after installation.
#[must_use]
pub fn success_message(name: &str, version: &str, keg: &Utf8Path) -> String {
    format!("Successfully installed {name} {version} to {keg}")
}

/// Warning printed for unverified head builds.
#[must_use]
pub fn head_warning(name: &str, branch: &str) -> String {
    format!(
        "Warning: building {name} from the tip of `{branch}`; head sources carry no checksum and are not verified"
    )
}

/// Format formula metadata for `info`.
#[must_use]
pub fn info_text(descriptor: &PackageDescriptor) -> String {
    let mut lines = vec![
        format!("{} {}", descriptor.name(), descriptor.version()),
        descriptor.desc().to_owned(),
        descriptor.homepage().to_owned(),
        format!("License: {}", descriptor.license()),
        String::new(),
        format!("Source: {}", descriptor.source().url),
        format!("SHA-256: {}", descriptor.source().sha256.as_str()),
    ];
    if let Some(head) = descriptor.head() {
        lines.push(format!("Head: {} ({})", head.url, head.branch));
    }
    let tools: Vec<&str> = descriptor
        .build_dependencies()
        .iter()
        .map(|dependency| dependency.name.as_str())
        .collect();
    if !tools.is_empty() {
        lines.push(format!("Build dependencies: {}", tools.join(", ")));
    }
    lines.join("\n")
}

/// Format formula metadata as JSON for `info --json`.
#[must_use]
pub fn info_json(descriptor: &PackageDescriptor) -> String {
    serde_json::to_string_pretty(descriptor).unwrap_or_else(|_| "{}".to_owned())
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use formula_installer::descriptor::PackageDescriptor;
/// use formula_installer::output::DryRunInfo;
///
/// let formula = PackageDescriptor::bundled().expect("bundled formula");
/// let keg = Utf8PathBuf::from("/opt/formula/Cellar/csv_converter/1.0.1");
///
/// let info = DryRunInfo {
///     name: formula.name().as_str(),
///     version: formula.version(),
///     source: &formula.source().url,
///     checksum: Some(formula.source().sha256.as_str()),
///     keg: &keg,
///     force: false,
///     build_dependencies: formula.build_dependencies(),
///     install: formula.install_procedure(),
///     test: formula.test_procedure(),
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("cargo install"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Package name.
    pub name: &'a str,
    /// Version to install.
    pub version: &'a str,
    /// Archive or clone URL.
    pub source: &'a str,
    /// Expected digest; `None` for head builds.
    pub checksum: Option<&'a str>,
    /// Keg the package would install into.
    pub keg: &'a Utf8Path,
    /// Whether an existing keg would be replaced.
    pub force: bool,
    /// Tools that would be probed.
    pub build_dependencies: &'a [BuildDependency],
    /// Install steps, unexpanded.
    pub install: &'a [Step],
    /// Smoke-test steps, unexpanded.
    pub test: &'a [Step],
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Package: {} {}", self.name, self.version),
            format!("Source: {}", self.source),
            format!("Checksum: {}", self.checksum.unwrap_or("none (unverified)")),
            format!("Keg: {}", self.keg),
            format!("Force: {}", self.force),
        ];

        if !self.build_dependencies.is_empty() {
            lines.push(String::new());
            lines.push("Build dependencies:".to_owned());
            for dependency in self.build_dependencies {
                lines.push(format!("  - {}", dependency.name));
            }
        }

        lines.push(String::new());
        lines.push("Install steps:".to_owned());
        for (index, step) in self.install.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }

        lines.push(String::new());
        lines.push("Smoke test:".to_owned());
        for step in self.test {
            lines.push(format!("  - {step}"));
        }

        lines.join("\n")
    }
}
