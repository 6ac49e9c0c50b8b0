//! The handle abstraction `CheckedFile` delegates to.
//!
//! Any `Read + Write + Seek` type that can also resize itself and take an
//! advisory lock qualifies. `std::fs::File` is the primary implementation;
//! `MemoryHandle` backs in-memory streams.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use fs2::FileExt;

/// Advisory lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOperation {
    /// Shared (reader) lock.
    Shared,
    /// Exclusive (writer) lock.
    Exclusive,
    /// Release a held lock.
    Unlock,
}

/// Operation set of an open file handle.
///
/// Implementations report lock contention on a non-blocking request as
/// `io::ErrorKind::WouldBlock`.
pub trait FileHandle: Read + Write + Seek {
    /// Resize to exactly `size` bytes. Does not move the cursor.
    ///
    /// # Errors
    /// Returns the handle's I/O error when the resize is refused.
    fn set_len(&mut self, size: u64) -> io::Result<()>;

    /// Apply an advisory lock operation.
    ///
    /// # Errors
    /// Returns `WouldBlock` on contention when `non_blocking` is set, or
    /// the handle's I/O error otherwise.
    fn lock(&mut self, operation: LockOperation, non_blocking: bool) -> io::Result<()>;
}

impl<H: FileHandle + ?Sized> FileHandle for Box<H> {
    fn set_len(&mut self, size: u64) -> io::Result<()> {
        (**self).set_len(size)
    }

    fn lock(&mut self, operation: LockOperation, non_blocking: bool) -> io::Result<()> {
        (**self).lock(operation, non_blocking)
    }
}

impl FileHandle for File {
    fn set_len(&mut self, size: u64) -> io::Result<()> {
        File::set_len(self, size)
    }

    fn lock(&mut self, operation: LockOperation, non_blocking: bool) -> io::Result<()> {
        // Fully qualified: newer std has inherent File locking methods with other signatures.
        let result = match (operation, non_blocking) {
            (LockOperation::Shared, false) => FileExt::lock_shared(self),
            (LockOperation::Shared, true) => FileExt::try_lock_shared(self),
            (LockOperation::Exclusive, false) => FileExt::lock_exclusive(self),
            (LockOperation::Exclusive, true) => FileExt::try_lock_exclusive(self),
            (LockOperation::Unlock, _) => FileExt::unlock(self),
        };
        result.map_err(|e| {
            if non_blocking && e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                io::Error::new(io::ErrorKind::WouldBlock, e)
            } else {
                e
            }
        })
    }
}

/// In-memory stream handle.
///
/// Locking is unsupported and always fails.
#[derive(Debug, Default, Clone)]
pub struct MemoryHandle {
    inner: Cursor<Vec<u8>>,
}

impl MemoryHandle {
    /// Empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream pre-filled with `data`, cursor at the start.
    #[must_use]
    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Cursor::new(data.into()),
        }
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        self.inner.get_ref()
    }

    /// Consume the handle, returning its contents.
    #[must_use]
    pub fn into_contents(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for MemoryHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for MemoryHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl FileHandle for MemoryHandle {
    fn set_len(&mut self, size: u64) -> io::Result<()> {
        let size = usize::try_from(size)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.inner.get_mut().resize(size, 0);
        Ok(())
    }

    fn lock(&mut self, _operation: LockOperation, _non_blocking: bool) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "memory streams do not support locking",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_set_len_shrinks_and_grows() {
        let mut handle = MemoryHandle::with_contents("hello");
        handle.set_len(2).unwrap();
        assert_eq!(handle.contents(), b"he");
        handle.set_len(4).unwrap();
        assert_eq!(handle.contents(), b"he\0\0");
    }

    #[test]
    fn test_memory_lock_unsupported() {
        let mut handle = MemoryHandle::new();
        let err = handle.lock(LockOperation::Shared, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_file_exclusive_contention() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("locked.txt");
        let mut first = File::create(&p).unwrap();
        let mut second = File::open(&p).unwrap();

        FileHandle::lock(&mut first, LockOperation::Exclusive, false).unwrap();
        let err = FileHandle::lock(&mut second, LockOperation::Exclusive, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        FileHandle::lock(&mut first, LockOperation::Unlock, false).unwrap();
        FileHandle::lock(&mut second, LockOperation::Exclusive, true).unwrap();
    }

    #[test]
    fn test_boxed_handle_delegates() {
        let mut handle: Box<dyn FileHandle> = Box::new(MemoryHandle::with_contents("abc"));
        handle.set_len(1).unwrap();
        let mut out = String::new();
        handle.read_to_string(&mut out).unwrap();
        assert_eq!(out, "a");
    }
}
