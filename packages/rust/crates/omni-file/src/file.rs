//! `CheckedFile` - a file handle whose every operation fails loudly.
//!
//! Each method delegates 1:1 to the wrapped [`FileHandle`] and only inspects
//! the outcome: success values pass through untouched, failures become a
//! [`FileError`] naming the operation and path. Nothing is retried.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::context::{OpenContext, Opener};
use crate::csv::{self, CsvFormat, RowParser};
use crate::error::{ErrorKind, FileError, Operation, Result};
use crate::handle::{FileHandle, LockOperation};
use crate::mode::OpenMode;
use crate::strip::TagStripper;

/// An open file that converts every failure into a typed [`FileError`].
///
/// Reads go through a read-ahead buffer; writes, seeks and truncation first
/// discard it so the handle cursor always matches the logical position.
/// The handle is closed on drop.
pub struct CheckedFile<H: FileHandle = File> {
    path: PathBuf,
    mode: OpenMode,
    reader: BufReader<H>,
    line: u64,
    stripper: TagStripper,
}

impl CheckedFile<File> {
    /// Open `path` on the local filesystem.
    ///
    /// # Errors
    /// `OpenFailed` when the mode is invalid or the file cannot be opened.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use omni_file::CheckedFile;
    ///
    /// let mut file = CheckedFile::open("notes.txt", "r")?;
    /// let first = file.read_line()?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self> {
        Self::open_with(path, mode, &OpenContext::new())
    }
}

impl<H: FileHandle> CheckedFile<H> {
    /// Open `path` through `context` (include path, custom opener).
    ///
    /// # Errors
    /// `OpenFailed` with the opener's error attached.
    pub fn open_with<P, O>(path: P, mode: &str, context: &OpenContext<O>) -> Result<Self>
    where
        P: AsRef<Path>,
        O: Opener<Handle = H>,
    {
        let path = path.as_ref();
        let mode = parse_mode(path, mode)?;
        let handle = context
            .open_handle(path, &mode)
            .map_err(|e| FileError::with_source(ErrorKind::OpenFailed, Operation::Open, path, e))?;
        tracing::debug!(path = %path.display(), mode = %mode, "opened file");
        Ok(Self::build(path, mode, handle))
    }

    /// Wrap an already open handle.
    ///
    /// # Errors
    /// `OpenFailed` when `mode` is not a valid mode string.
    pub fn from_handle<P: AsRef<Path>>(handle: H, path: P, mode: &str) -> Result<Self> {
        let path = path.as_ref();
        let mode = parse_mode(path, mode)?;
        Ok(Self::build(path, mode, handle))
    }

    fn build(path: &Path, mode: OpenMode, handle: H) -> Self {
        Self {
            path: path.to_path_buf(),
            mode,
            reader: BufReader::new(handle),
            line: 0,
            stripper: TagStripper::default(),
        }
    }

    /// Path the file was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the file was opened with.
    #[must_use]
    pub fn mode(&self) -> &OpenMode {
        &self.mode
    }

    /// Zero-based number of the line the cursor is on.
    ///
    /// Counted from line reads, `seek_line` and `\n` characters read; a
    /// byte [`seek`](Self::seek) to anywhere but the start leaves it stale.
    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// Borrow the wrapped handle.
    #[must_use]
    pub fn get_ref(&self) -> &H {
        self.reader.get_ref()
    }

    fn fail(&self, kind: ErrorKind, operation: Operation) -> FileError {
        FileError::new(kind, operation, &self.path)
    }

    fn fail_with(&self, kind: ErrorKind, operation: Operation, source: io::Error) -> FileError {
        FileError::with_source(kind, operation, &self.path, source)
    }

    /// Drop read-ahead so the handle cursor equals the logical position.
    fn discard_buffer(&mut self) -> io::Result<()> {
        if !self.reader.buffer().is_empty() {
            self.reader.seek(SeekFrom::Current(0))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Flush the handle.
    ///
    /// # Errors
    /// `FlushFailed`.
    pub fn flush(&mut self) -> Result<()> {
        self.reader
            .get_mut()
            .flush()
            .map_err(|e| self.fail_with(ErrorKind::FlushFailed, Operation::Flush, e))
    }

    /// Write `length` bytes of `data` (all of it when `None`).
    ///
    /// A length past the end of `data` is clamped. Returns the number of
    /// bytes written.
    ///
    /// # Errors
    /// `WriteFailed`.
    pub fn write(&mut self, data: &[u8], length: Option<usize>) -> Result<usize> {
        let n = length.map_or(data.len(), |len| len.min(data.len()));
        self.write_bytes(&data[..n], Operation::Write)?;
        Ok(n)
    }

    /// Write `fields` as one CSV row terminated by `\n`.
    ///
    /// # Errors
    /// `WriteFailed`.
    pub fn write_csv_row<S: AsRef<str>>(
        &mut self,
        fields: &[S],
        format: CsvFormat,
    ) -> Result<usize> {
        let row = csv::format_row(fields, format);
        self.write_bytes(row.as_bytes(), Operation::WriteCsvRow)?;
        Ok(row.len())
    }

    fn write_bytes(&mut self, data: &[u8], operation: Operation) -> Result<()> {
        self.discard_buffer()
            .and_then(|()| self.reader.get_mut().write_all(data))
            .map_err(|e| self.fail_with(ErrorKind::WriteFailed, operation, e))
    }

    /// Resize the file to `size` bytes. The cursor does not move.
    ///
    /// # Errors
    /// `TruncateFailed`.
    pub fn truncate(&mut self, size: u64) -> Result<()> {
        self.discard_buffer()
            .and_then(|()| self.reader.get_mut().set_len(size))
            .map_err(|e| self.fail_with(ErrorKind::TruncateFailed, Operation::Truncate, e))
    }

    // ------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------

    /// Apply an advisory lock operation.
    ///
    /// # Errors
    /// `LockFailed`; [`FileError::would_block`] is set when a non-blocking
    /// request lost to another holder.
    pub fn lock(&mut self, operation: LockOperation, non_blocking: bool) -> Result<()> {
        self.reader
            .get_mut()
            .lock(operation, non_blocking)
            .map_err(|e| {
                if non_blocking && e.kind() == io::ErrorKind::WouldBlock {
                    FileError::contended(&self.path, e)
                } else {
                    self.fail_with(ErrorKind::LockFailed, Operation::Lock, e)
                }
            })
    }

    /// Release the advisory lock.
    ///
    /// # Errors
    /// `LockFailed`.
    pub fn unlock(&mut self) -> Result<()> {
        self.lock(LockOperation::Unlock, false)
    }

    // ------------------------------------------------------------------
    // Positioning
    // ------------------------------------------------------------------

    /// Move the cursor by byte offset.
    ///
    /// The line number is reset only by a seek to the start; any other byte
    /// seek leaves it unchanged, so [`line_number`](Self::line_number) is not
    /// meaningful until the next [`rewind`](Self::rewind) or
    /// [`seek_line`](Self::seek_line).
    ///
    /// # Errors
    /// `SeekFailed`, e.g. for a position before the start.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<()> {
        self.reader
            .seek(pos)
            .map_err(|e| self.fail_with(ErrorKind::SeekFailed, Operation::Seek, e))?;
        if pos == SeekFrom::Start(0) {
            self.line = 0;
        }
        self.stripper.reset();
        Ok(())
    }

    /// Move the cursor back to the start.
    ///
    /// # Errors
    /// `SeekFailed`.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek_start(Operation::Rewind)
    }

    fn seek_start(&mut self, operation: Operation) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| self.fail_with(ErrorKind::SeekFailed, operation, e))?;
        self.line = 0;
        self.stripper.reset();
        Ok(())
    }

    /// Move the cursor to the start of zero-based line `line`.
    ///
    /// Stops at end of file when there are fewer lines.
    ///
    /// # Errors
    /// `SeekFailed` with the read error attached.
    pub fn seek_line(&mut self, line: u64) -> Result<()> {
        self.seek_start(Operation::SeekLine)?;
        let mut scratch = Vec::new();
        while self.line < line {
            scratch.clear();
            match self.reader.read_until(b'\n', &mut scratch) {
                Ok(0) => break,
                Ok(_) => self.line += 1,
                Err(e) => return Err(self.fail_with(ErrorKind::SeekFailed, Operation::SeekLine, e)),
            }
        }
        Ok(())
    }

    /// Current byte position.
    ///
    /// # Errors
    /// `TellFailed`.
    pub fn tell(&mut self) -> Result<u64> {
        self.reader
            .stream_position()
            .map_err(|e| self.fail_with(ErrorKind::TellFailed, Operation::Tell, e))
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Read one UTF-8 character.
    ///
    /// An invalid or truncated sequence reads as U+FFFD; only the bytes of
    /// that sequence are consumed, so following data is still returned.
    ///
    /// # Errors
    /// `ReachedEof` at end of file or when the handle fails.
    pub fn read_char(&mut self) -> Result<char> {
        self.try_read_char()?
            .ok_or_else(|| self.fail(ErrorKind::ReachedEof, Operation::ReadChar))
    }

    /// Like [`read_char`](Self::read_char), with end of file as `Ok(None)`.
    ///
    /// # Errors
    /// `ReachedEof` when the handle fails.
    pub fn try_read_char(&mut self) -> Result<Option<char>> {
        let Some(lead) = self.peek_byte()? else {
            return Ok(None);
        };
        self.reader.consume(1);

        let mut bytes = [lead, 0, 0, 0];
        let mut len = 1;
        let width = utf8_width(lead).unwrap_or(1);
        while len < width {
            let Some(next) = self.peek_byte()? else { break };
            if !is_continuation(lead, len, next) {
                break;
            }
            self.reader.consume(1);
            bytes[len] = next;
            len += 1;
        }

        let c = std::str::from_utf8(&bytes[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        if c == '\n' {
            self.line += 1;
        }
        Ok(Some(c))
    }

    fn peek_byte(&mut self) -> Result<Option<u8>> {
        match self.reader.fill_buf() {
            Ok(buf) => Ok(buf.first().copied()),
            Err(e) => Err(self.fail_with(ErrorKind::ReachedEof, Operation::ReadChar, e)),
        }
    }

    /// Read up to and including the next `\n`.
    ///
    /// # Errors
    /// `ReadFailed` at end of file (no cause), or with the handle's error
    /// attached.
    pub fn read_line(&mut self) -> Result<String> {
        self.try_read_line()?
            .ok_or_else(|| self.fail(ErrorKind::ReadFailed, Operation::ReadLine))
    }

    /// Like [`read_line`](Self::read_line), with end of file as `Ok(None)`.
    ///
    /// # Errors
    /// `ReadFailed`.
    pub fn try_read_line(&mut self) -> Result<Option<String>> {
        self.next_line(Operation::ReadLine)
    }

    /// Iterate over the remaining lines; ends cleanly at end of file.
    pub fn lines(&mut self) -> Lines<'_, H> {
        Lines { file: self }
    }

    /// Read a line with HTML and PHP tags removed, except `allowable_tags`
    /// (written like `"<p><a>"`). A tag left open at the end of a line keeps
    /// being stripped on the next call.
    ///
    /// # Errors
    /// `ReadFailed`.
    pub fn read_line_stripped(&mut self, allowable_tags: Option<&str>) -> Result<String> {
        let line = self
            .next_line(Operation::ReadLineStripped)?
            .ok_or_else(|| self.fail(ErrorKind::ReadFailed, Operation::ReadLineStripped))?;
        Ok(self.stripper.strip(&line, allowable_tags))
    }

    fn next_line(&mut self, operation: Operation) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| self.fail_with(ErrorKind::ReadFailed, operation, e))?;
        if n == 0 {
            return Ok(None);
        }
        let line = String::from_utf8(buf)
            .map_err(|e| self.fail_with(ErrorKind::ReadFailed, operation, invalid_data(e)))?;
        self.line += 1;
        Ok(Some(line))
    }

    /// Read one CSV record, which may span several lines.
    ///
    /// # Errors
    /// `ReadFailed` at end of file, for an enclosure left open at end of
    /// file, or when the handle fails.
    pub fn read_csv_row(&mut self, format: CsvFormat) -> Result<Vec<String>> {
        self.try_read_csv_row(format)?
            .ok_or_else(|| self.fail(ErrorKind::ReadFailed, Operation::ReadCsvRow))
    }

    /// Like [`read_csv_row`](Self::read_csv_row), with end of file as `Ok(None)`.
    ///
    /// # Errors
    /// `ReadFailed` for an unterminated enclosure or a handle failure.
    pub fn try_read_csv_row(&mut self, format: CsvFormat) -> Result<Option<Vec<String>>> {
        let op = Operation::ReadCsvRow;
        let Some(first) = self.next_line(op)? else {
            return Ok(None);
        };
        let mut parser = RowParser::new(format);
        let mut line = first;
        loop {
            if let Some(row) = parser.feed(&line) {
                return Ok(Some(row));
            }
            match self.next_line(op)? {
                Some(more) => line = more,
                None => {
                    return Err(self.fail_with(
                        ErrorKind::ReadFailed,
                        op,
                        invalid_data("unterminated enclosure at end of file"),
                    ));
                }
            }
        }
    }

    /// Read up to `len` bytes; fewer at end of file.
    ///
    /// # Errors
    /// `ReadFailed`.
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(READ_CHUNK));
        let limit = u64::try_from(len).unwrap_or(u64::MAX);
        let result = (&mut self.reader).take(limit).read_to_end(&mut out);
        result.map_err(|e| self.fail_with(ErrorKind::ReadFailed, Operation::Read, e))?;
        Ok(out)
    }

    /// Copy everything from the cursor to the end into `out`.
    ///
    /// # Errors
    /// `ReadFailed`, also when `out` rejects the data.
    pub fn passthru<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64> {
        io::copy(&mut self.reader, out)
            .map_err(|e| self.fail_with(ErrorKind::ReadFailed, Operation::Passthru, e))
    }

    /// Whether the cursor is at end of file.
    ///
    /// # Errors
    /// `ReadFailed`.
    pub fn is_eof(&mut self) -> Result<bool> {
        match self.reader.fill_buf() {
            Ok(buf) => Ok(buf.is_empty()),
            Err(e) => Err(self.fail_with(ErrorKind::ReadFailed, Operation::Eof, e)),
        }
    }
}

impl<H: FileHandle> std::fmt::Debug for CheckedFile<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckedFile")
            .field("path", &self.path)
            .field("mode", &self.mode.as_str())
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

/// Iterator over the remaining lines of a [`CheckedFile`].
pub struct Lines<'a, H: FileHandle> {
    file: &'a mut CheckedFile<H>,
}

impl<H: FileHandle> Iterator for Lines<'_, H> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.file.try_read_line().transpose()
    }
}

/// Initial allocation cap for [`CheckedFile::read`]; the buffer grows with
/// the data actually read.
const READ_CHUNK: usize = 8 * 1024;

fn parse_mode(path: &Path, mode: &str) -> Result<OpenMode> {
    mode.parse::<OpenMode>().map_err(|e| {
        FileError::with_source(
            ErrorKind::OpenFailed,
            Operation::Open,
            path,
            io::Error::new(io::ErrorKind::InvalidInput, e),
        )
    })
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}

/// Whether `byte` may follow `lead` at offset `pos` of a UTF-8 sequence.
///
/// The second byte is range-checked per lead so that overlong forms and
/// surrogates are rejected before they are consumed.
fn is_continuation(lead: u8, pos: usize, byte: u8) -> bool {
    let range = match (lead, pos) {
        (0xE0, 1) => 0xA0..=0xBF,
        (0xED, 1) => 0x80..=0x9F,
        (0xF0, 1) => 0x90..=0xBF,
        (0xF4, 1) => 0x80..=0x8F,
        _ => 0x80..=0xBF,
    };
    range.contains(&byte)
}

/// Byte length of a UTF-8 sequence from its lead byte.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}
