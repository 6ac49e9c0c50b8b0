//! Tests that every operation turns a handle failure into the right error.

use std::io::{self, Read, Seek, SeekFrom, Write};

use omni_file::{CheckedFile, ErrorKind, FileHandle, LockOperation, Operation};

/// Handle whose every call fails with the configured error kind.
struct BrokenHandle {
    kind: io::ErrorKind,
}

impl BrokenHandle {
    fn open(kind: io::ErrorKind) -> CheckedFile<Self> {
        CheckedFile::from_handle(Self { kind }, "/broken", "r+").unwrap()
    }

    fn error(&self) -> io::Error {
        io::Error::new(self.kind, "broken handle")
    }
}

impl Read for BrokenHandle {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(self.error())
    }
}

impl Write for BrokenHandle {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(self.error())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(self.error())
    }
}

impl Seek for BrokenHandle {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(self.error())
    }
}

impl FileHandle for BrokenHandle {
    fn set_len(&mut self, _size: u64) -> io::Result<()> {
        Err(self.error())
    }

    fn lock(&mut self, _operation: LockOperation, _non_blocking: bool) -> io::Result<()> {
        Err(self.error())
    }
}

fn assert_failure<T: std::fmt::Debug>(
    result: omni_file::Result<T>,
    kind: ErrorKind,
    operation: Operation,
) {
    let err = result.unwrap_err();
    assert_eq!(err.kind(), kind);
    assert_eq!(err.operation(), operation);
    assert_eq!(err.path(), std::path::Path::new("/broken"));
    assert_eq!(
        err.io_error().map(io::Error::kind),
        Some(io::ErrorKind::Other)
    );
}

#[test]
fn test_each_operation_maps_to_its_kind() {
    let mut f = BrokenHandle::open(io::ErrorKind::Other);

    assert_failure(f.flush(), ErrorKind::FlushFailed, Operation::Flush);
    assert_failure(f.read_char(), ErrorKind::ReachedEof, Operation::ReadChar);
    assert_failure(f.read_line(), ErrorKind::ReadFailed, Operation::ReadLine);
    assert_failure(
        f.read_line_stripped(None),
        ErrorKind::ReadFailed,
        Operation::ReadLineStripped,
    );
    assert_failure(
        f.read_csv_row(omni_file::CsvFormat::default()),
        ErrorKind::ReadFailed,
        Operation::ReadCsvRow,
    );
    assert_failure(f.read(4), ErrorKind::ReadFailed, Operation::Read);
    assert_failure(f.is_eof(), ErrorKind::ReadFailed, Operation::Eof);
    assert_failure(
        f.passthru(&mut io::sink()),
        ErrorKind::ReadFailed,
        Operation::Passthru,
    );
    assert_failure(
        f.lock(LockOperation::Exclusive, false),
        ErrorKind::LockFailed,
        Operation::Lock,
    );
    assert_failure(
        f.write_csv_row(&["a"], omni_file::CsvFormat::default()),
        ErrorKind::WriteFailed,
        Operation::WriteCsvRow,
    );
    assert_failure(f.write(b"abc", None), ErrorKind::WriteFailed, Operation::Write);
    assert_failure(f.seek(SeekFrom::Start(1)), ErrorKind::SeekFailed, Operation::Seek);
    assert_failure(f.seek_line(3), ErrorKind::SeekFailed, Operation::SeekLine);
    assert_failure(f.rewind(), ErrorKind::SeekFailed, Operation::Rewind);
    assert_failure(f.tell(), ErrorKind::TellFailed, Operation::Tell);
    assert_failure(f.truncate(0), ErrorKind::TruncateFailed, Operation::Truncate);
}

#[test]
fn test_blocking_lock_error_is_not_contention() {
    let mut f = BrokenHandle::open(io::ErrorKind::WouldBlock);
    let err = f.lock(LockOperation::Shared, false).unwrap_err();
    assert!(!err.would_block());

    let err = f.lock(LockOperation::Shared, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LockFailed);
    assert!(err.would_block());
}

#[test]
fn test_open_through_failing_opener() {
    let context = omni_file::OpenContext::new().opener(
        |_: &std::path::Path, _: &omni_file::OpenMode| -> io::Result<BrokenHandle> {
            Err(io::Error::from(io::ErrorKind::ConnectionRefused))
        },
    );
    let err = CheckedFile::open_with("remote://x", "r", &context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OpenFailed);
    assert_eq!(err.path(), std::path::Path::new("remote://x"));
    assert_eq!(
        err.io_error().map(io::Error::kind),
        Some(io::ErrorKind::ConnectionRefused)
    );
}
