//! Placeholder expansion for install and test steps.
//!
//! Step programs and arguments may reference the installation layout:
//!
//! - `{prefix}` - the keg directory the package installs into
//! - `{bin}` - `{prefix}/bin`
//! - `{name}` - the package name
//! - `{version}` - the version being installed
//!
//! An argument consisting solely of `{std_cargo_args}` expands to the
//! standard `cargo install` arguments: `--locked --root <prefix> --path .`.
//! Literal braces are written `{{` and `}}`.

use camino::{Utf8Path, Utf8PathBuf};

/// Whole-argument placeholder for the standard cargo install arguments.
pub const STD_CARGO_ARGS: &str = "{std_cargo_args}";

/// Placeholders accepted inside any program or argument.
const KNOWN_PLACEHOLDERS: &[&str] = &["prefix", "bin", "name", "version"];

/// Values substituted into step templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    /// Package name.
    pub name: &'a str,
    /// Version being installed.
    pub version: &'a str,
    /// Keg directory.
    pub prefix: &'a Utf8Path,
}

impl TemplateContext<'_> {
    /// Directory executables are installed into.
    #[must_use]
    pub fn bin(&self) -> Utf8PathBuf {
        self.prefix.join("bin")
    }

    fn lookup(&self, placeholder: &str) -> Option<String> {
        match placeholder {
            "prefix" => Some(self.prefix.to_string()),
            "bin" => Some(self.bin().to_string()),
            "name" => Some(self.name.to_owned()),
            "version" => Some(self.version.to_owned()),
            _ => None,
        }
    }
}

/// Errors raised while parsing or expanding a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The template names a placeholder that does not exist.
    #[error("unknown placeholder {{{placeholder}}} in \"{template}\"")]
    UnknownPlaceholder {
        /// The unknown placeholder name.
        placeholder: String,
        /// The template it appeared in.
        template: String,
    },

    /// A `{` or `}` is not part of a placeholder or escape.
    #[error("unbalanced brace in \"{template}\"")]
    Unbalanced {
        /// The malformed template.
        template: String,
    },

    /// `{std_cargo_args}` appears somewhere other than as a whole argument.
    #[error("{{std_cargo_args}} must be a whole argument, found in \"{template}\"")]
    MisplacedStdCargoArgs {
        /// The template it appeared in.
        template: String,
    },
}

/// The standard arguments for installing a cargo project into `prefix`.
#[must_use]
pub fn std_cargo_args(prefix: &Utf8Path) -> Vec<String> {
    vec![
        "--locked".to_owned(),
        "--root".to_owned(),
        prefix.to_string(),
        "--path".to_owned(),
        ".".to_owned(),
    ]
}

/// Check a program template without expanding it.
///
/// # Errors
///
/// Returns a [`TemplateError`] describing the first problem found.
pub fn check_program(template: &str) -> Result<(), TemplateError> {
    if template.contains(STD_CARGO_ARGS) {
        return Err(TemplateError::MisplacedStdCargoArgs {
            template: template.to_owned(),
        });
    }
    render(template, |placeholder| {
        KNOWN_PLACEHOLDERS
            .contains(&placeholder)
            .then(String::new)
    })
    .map(drop)
}

/// Check an argument template without expanding it.
///
/// # Errors
///
/// Returns a [`TemplateError`] describing the first problem found.
pub fn check_arg(template: &str) -> Result<(), TemplateError> {
    if template == STD_CARGO_ARGS {
        return Ok(());
    }
    check_program(template)
}

/// Expand a program template.
///
/// # Errors
///
/// Returns a [`TemplateError`] for malformed templates.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use formula_installer::template::{TemplateContext, expand_program};
///
/// let context = TemplateContext {
///     name: "csv_converter",
///     version: "1.0.1",
///     prefix: Utf8Path::new("/opt/cellar/csv_converter/1.0.1"),
/// };
/// let program = expand_program("{bin}/csv_converter", &context).expect("expand");
/// assert_eq!(program, "/opt/cellar/csv_converter/1.0.1/bin/csv_converter");
/// ```
pub fn expand_program(template: &str, context: &TemplateContext<'_>) -> Result<String, TemplateError> {
    check_program(template)?;
    render(template, |placeholder| context.lookup(placeholder))
}

/// Expand a list of argument templates, splicing in `{std_cargo_args}`.
///
/// # Errors
///
/// Returns a [`TemplateError`] for malformed templates.
pub fn expand_args(
    templates: &[String],
    context: &TemplateContext<'_>,
) -> Result<Vec<String>, TemplateError> {
    let mut expanded = Vec::with_capacity(templates.len());
    for template in templates {
        if template == STD_CARGO_ARGS {
            expanded.extend(std_cargo_args(context.prefix));
        } else {
            expanded.push(expand_program(template, context)?);
        }
    }
    Ok(expanded)
}

/// Walk `template`, substituting placeholders via `lookup`.
fn render<F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(inner);
                }
                if !closed {
                    return Err(TemplateError::Unbalanced {
                        template: template.to_owned(),
                    });
                }
                let value = lookup(&placeholder).ok_or_else(|| TemplateError::UnknownPlaceholder {
                    placeholder: placeholder.clone(),
                    template: template.to_owned(),
                })?;
                output.push_str(&value);
            }
            '}' => {
                return Err(TemplateError::Unbalanced {
                    template: template.to_owned(),
                });
            }
            other => output.push(other),
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn prefix() -> Utf8PathBuf {
        Utf8PathBuf::from("/cellar/csv_converter/1.0.1")
    }

    fn context(prefix: &Utf8Path) -> TemplateContext<'_> {
        TemplateContext {
            name: "csv_converter",
            version: "1.0.1",
            prefix,
        }
    }

    #[rstest]
    #[case::bin("{bin}/csv_converter", "/cellar/csv_converter/1.0.1/bin/csv_converter")]
    #[case::prefix("{prefix}/share", "/cellar/csv_converter/1.0.1/share")]
    #[case::name_version("{name}-{version}", "csv_converter-1.0.1")]
    #[case::escaped("{{literal}}", "{literal}")]
    #[case::plain("cargo", "cargo")]
    fn expands_placeholders(prefix: Utf8PathBuf, #[case] template: &str, #[case] expected: &str) {
        let expanded = expand_program(template, &context(&prefix)).expect("expand");
        assert_eq!(expanded, expected);
    }

    #[rstest]
    fn std_cargo_args_splices_install_arguments(prefix: Utf8PathBuf) {
        let args = vec!["install".to_owned(), STD_CARGO_ARGS.to_owned()];
        let expanded = expand_args(&args, &context(&prefix)).expect("expand");
        assert_eq!(
            expanded,
            vec![
                "install",
                "--locked",
                "--root",
                "/cellar/csv_converter/1.0.1",
                "--path",
                "."
            ]
        );
    }

    #[rstest]
    #[case::unknown("{libexec}/tool")]
    #[case::unterminated("{bin")]
    #[case::stray_close("bin}")]
    #[case::embedded_std_args("x{std_cargo_args}")]
    fn rejects_malformed_templates(#[case] template: &str) {
        assert!(check_arg(template).is_err(), "expected {template} to be rejected");
    }

    #[test]
    fn std_cargo_args_is_not_a_program() {
        let err = check_program(STD_CARGO_ARGS).expect_err("misplaced");
        assert!(matches!(err, TemplateError::MisplacedStdCargoArgs { .. }));
    }

    #[test]
    fn unknown_placeholder_error_names_it() {
        let err = check_program("{libexec}").expect_err("unknown");
        assert_eq!(
            err.to_string(),
            "unknown placeholder {libexec} in \"{libexec}\""
        );
    }
}
