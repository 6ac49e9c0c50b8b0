//! Tests for CSV row reading and writing.

use tempfile::TempDir;

use omni_file::{CheckedFile, CsvFormat, ErrorKind, MemoryHandle, Operation};

#[test]
fn test_read_simple_row() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("rows.csv");
    std::fs::write(&p, "a,b,c\n").unwrap();

    let mut file = CheckedFile::open(&p, "r").unwrap();
    assert_eq!(
        file.read_csv_row(CsvFormat::default()).unwrap(),
        vec!["a", "b", "c"]
    );
    let err = file.read_csv_row(CsvFormat::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadFailed);
    assert_eq!(err.operation(), Operation::ReadCsvRow);
}

#[test]
fn test_write_then_reopen_and_read() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("out.csv");

    let mut out = CheckedFile::open(&p, "w").unwrap();
    assert_eq!(out.write_csv_row(&["x", "y"], CsvFormat::default()).unwrap(), 4);
    out.flush().unwrap();
    drop(out);

    let mut input = CheckedFile::open(&p, "r").unwrap();
    assert_eq!(
        input.read_csv_row(CsvFormat::default()).unwrap(),
        vec!["x", "y"]
    );
}

#[test]
fn test_unterminated_enclosure_fails() {
    let dir = TempDir::new().unwrap();
    let p = dir.path().join("broken.csv");
    std::fs::write(&p, "ok,row\n\"never closed,x\nmore\n").unwrap();

    let mut file = CheckedFile::open(&p, "r").unwrap();
    file.read_csv_row(CsvFormat::default()).unwrap();
    let err = file.read_csv_row(CsvFormat::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadFailed);
    assert!(err.io_error().is_some());
}

#[test]
fn test_multiline_field_and_blank_line() {
    let mut file = CheckedFile::from_handle(
        MemoryHandle::with_contents("\"two\nlines\",b\n\nlast\n"),
        "memory",
        "r",
    )
    .unwrap();
    let format = CsvFormat::default();
    assert_eq!(file.read_csv_row(format).unwrap(), vec!["two\nlines", "b"]);
    assert!(file.read_csv_row(format).unwrap().is_empty());
    assert_eq!(file.read_csv_row(format).unwrap(), vec!["last"]);
    assert!(file.try_read_csv_row(format).unwrap().is_none());
}

#[test]
fn test_custom_delimiter_round_trip() {
    let format = CsvFormat::default().with_delimiter('\t').with_escape(None);
    let mut file = CheckedFile::from_handle(MemoryHandle::new(), "memory", "w+").unwrap();

    file.write_csv_row(&["tab\tinside", "plain"], format).unwrap();
    file.rewind().unwrap();
    assert_eq!(
        file.read_csv_row(format).unwrap(),
        vec!["tab\tinside", "plain"]
    );
    assert_eq!(file.get_ref().contents(), b"\"tab\tinside\"\tplain\n");
}

#[test]
fn test_field_spanning_many_lines() {
    let mut contents = String::from("\"head\n");
    contents.push_str(&"body\n".repeat(5_000));
    contents.push_str("foot\",next\nafter\n");

    let mut file =
        CheckedFile::from_handle(MemoryHandle::with_contents(contents), "memory", "r").unwrap();
    let format = CsvFormat::default();
    let row = file.read_csv_row(format).unwrap();
    assert_eq!(row[0].lines().count(), 5_002);
    assert_eq!(row[1], "next");
    assert_eq!(file.read_csv_row(format).unwrap(), vec!["after"]);
}
