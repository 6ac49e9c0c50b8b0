#![allow(clippy::doc_markdown)]

//! omni-file - Fail-fast file handles for Omni DevEnv
//!
//! Wraps a file handle so that every operation either returns its success
//! value or a typed [`FileError`]. No sentinel values (`false`, `-1`, empty
//! reads) ever reach the caller.
//!
//! # Features
//!
//! - **Typed failures**: one [`ErrorKind`] per failing operation, with the
//!   path, the operation name and the underlying `io::Error` as source
//! - **Pluggable handles**: [`FileHandle`] for `std::fs::File`, in-memory
//!   streams, or any custom scheme via [`OpenContext`]
//! - **Line, char and CSV reads** with explicit end-of-file handling
//! - **Advisory locks** through `fs2`
//!
//! # Architecture (ODF-REP Compliant)
//!
//! ```text
//! omni-file/src/
//! ├── lib.rs      # Re-exports (this file)
//! ├── error.rs    # FileError, ErrorKind, Operation
//! ├── handle.rs   # FileHandle trait, MemoryHandle, LockOperation
//! ├── mode.rs     # fopen-style mode strings
//! ├── context.rs  # OpenContext: include path & openers
//! ├── csv.rs      # CSV row codec
//! ├── strip.rs    # Tag stripping for read_line_stripped
//! └── file.rs     # CheckedFile
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_file::{CheckedFile, CsvFormat, ErrorKind};
//!
//! let mut out = CheckedFile::open("/tmp/t.txt", "w")?;
//! out.write(b"hello", None)?;
//! out.flush()?;
//!
//! let mut input = CheckedFile::open("/tmp/t.txt", "r")?;
//! assert_eq!(input.read_line()?, "hello");
//!
//! match input.read_char() {
//!     Err(e) if e.kind() == ErrorKind::ReachedEof => { /* done */ }
//!     other => { other?; }
//! }
//! ```

// ============================================================================
// Module Declarations (ODF-REP: Atomic Structure)
// ============================================================================

mod context;
mod csv;
mod error;
mod file;
mod handle;
mod mode;
mod strip;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use context::{INCLUDE_PATH_ENV, LocalOpener, OpenContext, Opener};
pub use csv::CsvFormat;
pub use error::{ErrorKind, FileError, Operation, Result};
pub use file::{CheckedFile, Lines};
pub use handle::{FileHandle, LockOperation, MemoryHandle};
pub use mode::{ModeError, OpenMode};
