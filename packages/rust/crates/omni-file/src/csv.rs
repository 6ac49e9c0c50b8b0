//! CSV row parsing and formatting.
//!
//! Quoting rules follow the classic `fgetcsv`/`fputcsv` pair: an enclosed
//! field may span lines, a doubled enclosure is a literal enclosure, and the
//! escape character keeps the following character from closing the field
//! (the escape character itself stays in the output).

/// Delimiter, enclosure and escape characters for CSV rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    /// Field separator.
    pub delimiter: char,
    /// Quote character wrapping fields that need it.
    pub enclosure: char,
    /// Escape character inside enclosed fields, `None` to disable.
    pub escape: Option<char>,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: ',',
            enclosure: '"',
            escape: Some('\\'),
        }
    }
}

impl CsvFormat {
    /// Use `delimiter` as field separator.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Use `enclosure` as quote character.
    #[must_use]
    pub fn with_enclosure(mut self, enclosure: char) -> Self {
        self.enclosure = enclosure;
        self
    }

    /// Use `escape` as escape character (`None` disables escaping).
    #[must_use]
    pub fn with_escape(mut self, escape: Option<char>) -> Self {
        self.escape = escape;
        self
    }

    fn escape_char(&self) -> Option<char> {
        self.escape.filter(|&c| c != self.enclosure)
    }
}

/// Where the parser is inside the current field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    /// Escape character seen inside an enclosure.
    QuotedEscape,
    /// Enclosure seen inside an enclosure: closes the field unless doubled.
    QuoteInQuoted,
}

/// Incremental record parser fed one physical line at a time.
///
/// Each character is visited once, so a field spanning many lines costs
/// linear time.
#[derive(Debug)]
pub(crate) struct RowParser {
    format: CsvFormat,
    escape: Option<char>,
    state: State,
    fields: Vec<String>,
    field: String,
}

impl RowParser {
    pub(crate) fn new(format: CsvFormat) -> Self {
        Self {
            format,
            escape: format.escape_char(),
            state: State::FieldStart,
            fields: Vec::new(),
            field: String::new(),
        }
    }

    /// Feed the next line, line ending included.
    ///
    /// Returns the finished row, or `None` while an enclosure is still open
    /// and the next line belongs to the same record. A blank line on its
    /// own yields an empty row.
    pub(crate) fn feed(&mut self, line: &str) -> Option<Vec<String>> {
        let body = strip_line_ending(line);
        if body.is_empty() && self.state == State::FieldStart && self.fields.is_empty() {
            return Some(Vec::new());
        }

        for c in body.chars() {
            self.push(c);
        }

        match self.state {
            State::Quoted | State::QuotedEscape => {
                self.field.push_str(&line[body.len()..]);
                self.state = State::Quoted;
                None
            }
            State::FieldStart | State::Unquoted | State::QuoteInQuoted => {
                self.fields.push(std::mem::take(&mut self.field));
                self.state = State::FieldStart;
                Some(std::mem::take(&mut self.fields))
            }
        }
    }

    fn push(&mut self, c: char) {
        let format = self.format;
        match self.state {
            State::FieldStart if c == format.enclosure => self.state = State::Quoted,
            State::FieldStart | State::Unquoted => self.push_unquoted(c),
            State::Quoted => {
                if Some(c) == self.escape {
                    self.field.push(c);
                    self.state = State::QuotedEscape;
                } else if c == format.enclosure {
                    self.state = State::QuoteInQuoted;
                } else {
                    self.field.push(c);
                }
            }
            State::QuotedEscape => {
                self.field.push(c);
                self.state = State::Quoted;
            }
            State::QuoteInQuoted => {
                if c == format.enclosure {
                    self.field.push(c);
                    self.state = State::Quoted;
                } else {
                    self.push_unquoted(c);
                }
            }
        }
    }

    fn push_unquoted(&mut self, c: char) {
        if c == self.format.delimiter {
            self.fields.push(std::mem::take(&mut self.field));
            self.state = State::FieldStart;
        } else {
            self.field.push(c);
            self.state = State::Unquoted;
        }
    }
}

/// Format one record terminated by `\n`.
pub(crate) fn format_row<S: AsRef<str>>(fields: &[S], format: CsvFormat) -> String {
    let escape = format.escape_char();
    let mut line = String::new();

    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(format.delimiter);
        }
        let field = field.as_ref();
        if !needs_enclosure(field, format) {
            line.push_str(field);
            continue;
        }

        line.push(format.enclosure);
        let mut escaped = false;
        for c in field.chars() {
            if Some(c) == escape {
                escaped = true;
            } else if !escaped && c == format.enclosure {
                line.push(format.enclosure);
            } else {
                escaped = false;
            }
            line.push(c);
        }
        line.push(format.enclosure);
    }

    line.push('\n');
    line
}

fn needs_enclosure(field: &str, format: CsvFormat) -> bool {
    field.chars().any(|c| {
        c == format.delimiter
            || c == format.enclosure
            || Some(c) == format.escape_char()
            || matches!(c, '\n' | '\r' | '\t' | ' ')
    })
}

fn strip_line_ending(record: &str) -> &str {
    record
        .strip_suffix("\r\n")
        .or_else(|| record.strip_suffix('\n'))
        .or_else(|| record.strip_suffix('\r'))
        .unwrap_or(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_row(record: &str, format: CsvFormat) -> Option<Vec<String>> {
        let mut parser = RowParser::new(format);
        record
            .split_inclusive('\n')
            .map(|line| parser.feed(line))
            .last()
            .flatten()
    }

    fn parse(record: &str) -> Option<Vec<String>> {
        parse_row(record, CsvFormat::default())
    }

    #[test]
    fn test_simple_row() {
        assert_eq!(parse("a,b,c\n").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_blank_line_is_empty_row() {
        assert!(parse("\n").unwrap().is_empty());
        assert!(parse("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_trailing_delimiter_keeps_empty_field() {
        assert_eq!(parse("a,,\n").unwrap(), vec!["a", "", ""]);
    }

    #[test]
    fn test_enclosed_fields() {
        assert_eq!(
            parse("\"x, y\",\"say \"\"hi\"\"\",z\n").unwrap(),
            vec!["x, y", "say \"hi\"", "z"]
        );
    }

    #[test]
    fn test_escape_char_kept_and_does_not_close() {
        assert_eq!(parse(r#""a\"b",c"#).unwrap(), vec![r#"a\"b"#, "c"]);
    }

    #[test]
    fn test_text_after_closing_enclosure_is_appended() {
        assert_eq!(parse("\"ab\"cd,e").unwrap(), vec!["abcd", "e"]);
    }

    #[test]
    fn test_open_enclosure_needs_more_input() {
        assert!(parse("\"multi\n").is_none());
        assert_eq!(parse("\"multi\nline\",end\n").unwrap(), vec!["multi\nline", "end"]);
    }

    #[test]
    fn test_escape_at_line_end_keeps_line_break() {
        let mut parser = RowParser::new(CsvFormat::default());
        assert!(parser.feed("\"a\\\n").is_none());
        assert_eq!(parser.feed("b\"\n").unwrap(), vec!["a\\\nb"]);
    }

    #[test]
    fn test_parser_resets_after_each_row() {
        let mut parser = RowParser::new(CsvFormat::default());
        assert!(parser.feed("\"x\n").is_none());
        assert_eq!(parser.feed("y\",z\n").unwrap(), vec!["x\ny", "z"]);
        assert!(parser.feed("\n").unwrap().is_empty());
        assert_eq!(parser.feed("1,2").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_long_multiline_field() {
        let mut parser = RowParser::new(CsvFormat::default());
        assert!(parser.feed("\"start\n").is_none());
        for _ in 0..10_000 {
            assert!(parser.feed("more\n").is_none());
        }
        let row = parser.feed("end\",tail\n").unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].lines().count(), 10_002);
        assert_eq!(row[1], "tail");
    }

    #[test]
    fn test_custom_format() {
        let format = CsvFormat::default().with_delimiter(';').with_enclosure('\'');
        assert_eq!(
            parse_row("'a;b';c\n", format).unwrap(),
            vec!["a;b", "c"]
        );
    }

    #[test]
    fn test_format_plain_and_quoted() {
        let format = CsvFormat::default();
        assert_eq!(format_row(&["x", "y"], format), "x,y\n");
        assert_eq!(
            format_row(&["a b", "q\"t", "c,d"], format),
            "\"a b\",\"q\"\"t\",\"c,d\"\n"
        );
    }

    #[test]
    fn test_format_escaped_enclosure_not_doubled() {
        let format = CsvFormat::default();
        assert_eq!(format_row(&[r#"a\"b"#], format), "\"a\\\"b\"\n");
    }

    #[test]
    fn test_escape_equal_to_enclosure_is_ignored() {
        let format = CsvFormat::default().with_escape(Some('"'));
        assert_eq!(format_row(&["plain"], format), "plain\n");
        assert_eq!(format_row(&["q\"t"], format), "\"q\"\"t\"\n");
    }

    #[test]
    fn test_format_then_parse() {
        let format = CsvFormat::default();
        let fields = ["plain", "with space", "multi\nline", "q\"uote"];
        let line = format_row(&fields, format);
        assert_eq!(parse_row(&line, format).unwrap(), fields);
    }
}
