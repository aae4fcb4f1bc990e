//! Directory resolution abstraction for platform-specific paths.
//!
//! The installation root defaults to `<data_local_dir>/formula` (for example
//! `~/.local/share/formula` on Linux). The `FORMULA_ROOT` environment variable
//! replaces it, and the `--root` flag replaces both.

use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable overriding the default installation root.
pub const ROOT_ENV: &str = "FORMULA_ROOT";

/// Directory name appended to the platform data directory.
const ROOT_DIRNAME: &str = "formula";

/// Source of platform directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The per-user local data directory, if the platform has one.
    fn data_local_dir(&self) -> Option<PathBuf>;

    /// Value of [`ROOT_ENV`], if set.
    fn root_override(&self) -> Option<OsString>;
}

/// The default installation root.
///
/// A non-empty [`ROOT_ENV`] wins over the platform data directory.
#[must_use]
pub fn formula_root(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    if let Some(root) = dirs.root_override().filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(root));
    }
    dirs.data_local_dir().map(|dir| dir.join(ROOT_DIRNAME))
}

/// Platform directories resolved with `directories-next`.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve the current user's directories.
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|inner| Self { inner })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn data_local_dir(&self) -> Option<PathBuf> {
        Some(self.inner.data_local_dir().to_path_buf())
    }

    fn root_override(&self) -> Option<OsString> {
        std::env::var_os(ROOT_ENV)
    }
}
