//! Open context: include-path search and pluggable openers.
//!
//! `OpenContext` is the optional I/O context passed to
//! [`CheckedFile::open_with`](crate::CheckedFile::open_with). It decides
//! *which* handle gets created for a path; the default opener is the local
//! filesystem.

use std::env;
use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::handle::FileHandle;
use crate::mode::OpenMode;

/// Environment variable holding the default include path (platform path list).
pub const INCLUDE_PATH_ENV: &str = "OMNI_FILE_INCLUDE_PATH";

static INCLUDE_PATH: OnceLock<Vec<PathBuf>> = OnceLock::new();

/// Creates handles for paths.
///
/// Implemented for any `Fn(&Path, &OpenMode) -> io::Result<H>`, which is the
/// usual way to plug in a custom scheme.
pub trait Opener {
    /// Handle type produced.
    type Handle: FileHandle;

    /// Open `path` in `mode`.
    ///
    /// # Errors
    /// Returns the I/O error that prevented opening.
    fn open(&self, path: &Path, mode: &OpenMode) -> io::Result<Self::Handle>;
}

/// Opens files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOpener;

impl Opener for LocalOpener {
    type Handle = File;

    fn open(&self, path: &Path, mode: &OpenMode) -> io::Result<File> {
        mode.to_open_options().open(path)
    }
}

impl<F, H> Opener for F
where
    F: Fn(&Path, &OpenMode) -> io::Result<H>,
    H: FileHandle,
{
    type Handle = H;

    fn open(&self, path: &Path, mode: &OpenMode) -> io::Result<H> {
        self(path, mode)
    }
}

/// Options applied when opening a `CheckedFile`.
#[derive(Debug, Clone)]
pub struct OpenContext<O = LocalOpener> {
    use_include_path: bool,
    include_path: Vec<PathBuf>,
    opener: O,
}

impl Default for OpenContext<LocalOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenContext<LocalOpener> {
    /// Local filesystem, include path disabled and empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            use_include_path: false,
            include_path: Vec::new(),
            opener: LocalOpener,
        }
    }

    /// Local filesystem with the include path taken from
    /// `OMNI_FILE_INCLUDE_PATH`. Searching stays disabled until
    /// [`use_include_path`](Self::use_include_path) is set.
    #[must_use]
    pub fn from_env() -> Self {
        let include_path = INCLUDE_PATH
            .get_or_init(|| {
                env::var_os(INCLUDE_PATH_ENV)
                    .map(|value| parse_include_path(&value))
                    .unwrap_or_default()
            })
            .clone();
        Self {
            include_path,
            ..Self::new()
        }
    }
}

impl<O: Opener> OpenContext<O> {
    /// Search the include path for relative paths.
    #[must_use]
    pub fn use_include_path(mut self, enabled: bool) -> Self {
        self.use_include_path = enabled;
        self
    }

    /// Replace the include path.
    #[must_use]
    pub fn include_path<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_path = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Swap in a different opener, keeping the include path settings.
    #[must_use]
    pub fn opener<O2: Opener>(self, opener: O2) -> OpenContext<O2> {
        OpenContext {
            use_include_path: self.use_include_path,
            include_path: self.include_path,
            opener,
        }
    }

    /// Directories searched for relative paths.
    #[must_use]
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_path
    }

    /// Whether include-path search is enabled.
    #[must_use]
    pub fn uses_include_path(&self) -> bool {
        self.use_include_path
    }

    /// Open `path`, searching the include path first when enabled.
    ///
    /// Include directories are tried in order; a directory where the file is
    /// missing is skipped. Any other failure stops the search. If no include
    /// directory yields a handle, `path` itself is opened.
    pub(crate) fn open_handle(&self, path: &Path, mode: &OpenMode) -> io::Result<O::Handle> {
        if self.use_include_path && path.is_relative() {
            for dir in &self.include_path {
                let candidate = dir.join(path);
                match self.opener.open(&candidate, mode) {
                    Ok(handle) => {
                        tracing::trace!(path = %candidate.display(), "resolved via include path");
                        return Ok(handle);
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        self.opener.open(path, mode)
    }
}

/// Split a platform path list, dropping empty entries.
fn parse_include_path(value: &OsStr) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}
