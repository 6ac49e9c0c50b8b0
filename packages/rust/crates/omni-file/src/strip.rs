//! Incremental HTML/PHP tag stripping for `read_line_stripped`.
//!
//! A tag may start on one line and end on a later one, so the stripper keeps
//! its state between calls. Comments (`<!-- ... -->`) are always removed.
//! A `<` followed by whitespace is ordinary text.

/// Longest tag kept in memory; longer tags are skipped and always removed.
const MAX_TAG_LEN: usize = 4096;

const COMMENT_END: [char; 3] = ['-', '-', '>'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum State {
    #[default]
    Text,
    Tag {
        buf: String,
        quote: Option<char>,
    },
    /// Inside a tag too long to buffer.
    Skip {
        quote: Option<char>,
    },
    Comment {
        tail: [char; 3],
    },
}

/// Tag stripper with state carried across lines.
#[derive(Debug, Clone, Default)]
pub(crate) struct TagStripper {
    state: State,
}

impl TagStripper {
    /// Forget any partially read tag.
    pub(crate) fn reset(&mut self) {
        self.state = State::Text;
    }

    /// Strip tags from `input`, keeping those named in `allowable`
    /// (e.g. `"<p><a>"`).
    pub(crate) fn strip(&mut self, input: &str, allowable: Option<&str>) -> String {
        let allowed = allowable.map(parse_allowable).unwrap_or_default();
        let mut out = String::with_capacity(input.len());

        for c in input.chars() {
            match &mut self.state {
                State::Text => {
                    if c == '<' {
                        self.state = State::Tag {
                            buf: String::from('<'),
                            quote: None,
                        };
                    } else {
                        out.push(c);
                    }
                }
                State::Tag { buf, quote } if buf.len() >= MAX_TAG_LEN => {
                    let mut quote = *quote;
                    self.state = if skip_tag_char(&mut quote, c) {
                        State::Text
                    } else {
                        State::Skip { quote }
                    };
                }
                State::Tag { buf, quote } => {
                    if buf.len() == 1 && c.is_whitespace() {
                        out.push('<');
                        out.push(c);
                        self.state = State::Text;
                        continue;
                    }
                    buf.push(c);
                    match *quote {
                        Some(q) if c == q => *quote = None,
                        Some(_) => {}
                        None if c == '"' || c == '\'' => *quote = Some(c),
                        None if c == '>' => {
                            if allowed.iter().any(|name| *name == tag_name(buf)) {
                                out.push_str(buf);
                            }
                            self.state = State::Text;
                        }
                        None if buf == "<!--" => {
                            self.state = State::Comment { tail: ['\0'; 3] };
                        }
                        None => {}
                    }
                }
                State::Skip { quote } => {
                    if skip_tag_char(quote, c) {
                        self.state = State::Text;
                    }
                }
                State::Comment { tail } => {
                    *tail = [tail[1], tail[2], c];
                    if *tail == COMMENT_END {
                        self.state = State::Text;
                    }
                }
            }
        }
        out
    }
}

/// Track quoting inside a skipped tag; `true` once the tag is closed.
fn skip_tag_char(quote: &mut Option<char>, c: char) -> bool {
    match *quote {
        Some(q) if c == q => *quote = None,
        Some(_) => {}
        None if c == '"' || c == '\'' => *quote = Some(c),
        None => return c == '>',
    }
    false
}

/// Lowercased tag names from a string like `"<p><br/>"`.
fn parse_allowable(allowable: &str) -> Vec<String> {
    allowable
        .split('<')
        .map(tag_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Name of a tag, ignoring a leading `<` and `/`.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}
