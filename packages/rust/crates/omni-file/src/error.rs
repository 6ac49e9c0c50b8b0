//! Error types for checked file operations.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used by every `CheckedFile` operation.
pub type Result<T> = std::result::Result<T, FileError>;

/// Failure category, one per failing operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The file could not be opened.
    OpenFailed,
    /// Buffered output could not be flushed.
    FlushFailed,
    /// End of file reached while reading a character.
    ReachedEof,
    /// A read operation failed (including end of file for line reads).
    ReadFailed,
    /// The advisory lock could not be acquired or released.
    LockFailed,
    /// A write operation failed.
    WriteFailed,
    /// The cursor could not be moved.
    SeekFailed,
    /// The cursor position could not be queried.
    TellFailed,
    /// The file could not be truncated.
    TruncateFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OpenFailed => "open failed",
            Self::FlushFailed => "flush failed",
            Self::ReachedEof => "reached end of file",
            Self::ReadFailed => "read failed",
            Self::LockFailed => "lock failed",
            Self::WriteFailed => "write failed",
            Self::SeekFailed => "seek failed",
            Self::TellFailed => "tell failed",
            Self::TruncateFailed => "truncate failed",
        };
        f.write_str(text)
    }
}

/// The `CheckedFile` method that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `open` / `open_with`.
    Open,
    /// `flush`.
    Flush,
    /// `read_char` / `try_read_char`.
    ReadChar,
    /// `read_csv_row` / `try_read_csv_row`.
    ReadCsvRow,
    /// `read_line` / `try_read_line` / `lines`.
    ReadLine,
    /// `read_line_stripped`.
    ReadLineStripped,
    /// `read`.
    Read,
    /// `passthru`.
    Passthru,
    /// `is_eof`.
    Eof,
    /// `lock` / `unlock`.
    Lock,
    /// `write_csv_row`.
    WriteCsvRow,
    /// `write`.
    Write,
    /// `seek`.
    Seek,
    /// `seek_line`.
    SeekLine,
    /// `rewind`.
    Rewind,
    /// `tell`.
    Tell,
    /// `truncate`.
    Truncate,
}

impl Operation {
    /// Stable lowercase name used in messages and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Flush => "flush",
            Self::ReadChar => "read_char",
            Self::ReadCsvRow => "read_csv_row",
            Self::ReadLine => "read_line",
            Self::ReadLineStripped => "read_line_stripped",
            Self::Read => "read",
            Self::Passthru => "passthru",
            Self::Eof => "is_eof",
            Self::Lock => "lock",
            Self::WriteCsvRow => "write_csv_row",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::SeekLine => "seek_line",
            Self::Rewind => "rewind",
            Self::Tell => "tell",
            Self::Truncate => "truncate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a failed `CheckedFile` operation.
///
/// Carries the failure kind, the operation that failed, the path the file
/// was opened with and, when the handle reported one, the underlying
/// `io::Error` as `source()`.
#[derive(Error, Debug)]
#[error("{operation}: {kind} for {}", .path.display())]
pub struct FileError {
    kind: ErrorKind,
    operation: Operation,
    path: PathBuf,
    would_block: bool,
    #[source]
    source: Option<io::Error>,
}

impl FileError {
    /// Error without an underlying cause (sentinel-style failure).
    pub(crate) fn new(kind: ErrorKind, operation: Operation, path: &Path) -> Self {
        let error = Self {
            kind,
            operation,
            path: path.to_path_buf(),
            would_block: false,
            source: None,
        };
        error.trace();
        error
    }

    /// Error wrapping the `io::Error` reported by the handle.
    pub(crate) fn with_source(
        kind: ErrorKind,
        operation: Operation,
        path: &Path,
        source: io::Error,
    ) -> Self {
        let error = Self {
            kind,
            operation,
            path: path.to_path_buf(),
            would_block: false,
            source: Some(source),
        };
        error.trace();
        error
    }

    /// Lock refused because another holder has it and the caller asked not to block.
    pub(crate) fn contended(path: &Path, source: io::Error) -> Self {
        let mut error = Self::with_source(ErrorKind::LockFailed, Operation::Lock, path, source);
        error.would_block = true;
        error
    }

    fn trace(&self) {
        tracing::debug!(
            operation = self.operation.as_str(),
            kind = %self.kind,
            path = %self.path.display(),
            cause = ?self.source,
            "file operation failed"
        );
    }

    /// Failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Path the file was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` for `ErrorKind::ReachedEof`.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == ErrorKind::ReachedEof
    }

    /// `true` when a non-blocking lock request was refused due to contention.
    #[must_use]
    pub fn would_block(&self) -> bool {
        self.would_block
    }

    /// Underlying I/O error, if the handle reported one.
    #[must_use]
    pub fn io_error(&self) -> Option<&io::Error> {
        self.source.as_ref()
    }
}
