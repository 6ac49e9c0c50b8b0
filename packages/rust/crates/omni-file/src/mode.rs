//! fopen-style mode strings.
//!
//! Accepted forms: one of `r`, `w`, `a`, `x`, `c`, optionally followed by
//! `+`, `b` and `t` in any order (`b`/`t` are accepted and ignored).

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;

use thiserror::Error;

/// Error for an unrecognised mode string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    /// Mode string was empty.
    #[error("Empty open mode")]
    Empty,

    /// Leading character is not one of `r`, `w`, `a`, `x`, `c`.
    #[error("Unknown open mode: {0}")]
    Unknown(String),

    /// Trailing modifier other than `+`, `b`, `t`, or a repeated one.
    #[error("Invalid open mode modifier {1:?} in {0}")]
    Modifier(String, char),
}

/// Parsed open mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMode {
    raw: String,
    read: bool,
    write: bool,
    append: bool,
    truncate: bool,
    create: bool,
    create_new: bool,
}

impl OpenMode {
    /// The mode string as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether reads are permitted.
    #[must_use]
    pub fn readable(&self) -> bool {
        self.read
    }

    /// Whether writes are permitted.
    #[must_use]
    pub fn writable(&self) -> bool {
        self.write
    }

    /// Writes always go to the end of the file.
    #[must_use]
    pub fn append(&self) -> bool {
        self.append
    }

    /// Existing content is discarded on open.
    #[must_use]
    pub fn truncate(&self) -> bool {
        self.truncate
    }

    /// A missing file is created.
    #[must_use]
    pub fn create(&self) -> bool {
        self.create
    }

    /// Opening fails if the file already exists.
    #[must_use]
    pub fn create_new(&self) -> bool {
        self.create_new
    }

    /// Equivalent `std::fs::OpenOptions`.
    #[must_use]
    pub fn to_open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.read)
            .write(self.write && !self.append)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        options
    }
}

impl FromStr for OpenMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let Some(base) = chars.next() else {
            return Err(ModeError::Empty);
        };

        let (read, write, append, truncate, create, create_new) = match base {
            'r' => (true, false, false, false, false, false),
            'w' => (false, true, false, true, true, false),
            'a' => (false, true, true, false, true, false),
            'x' => (false, true, false, false, false, true),
            'c' => (false, true, false, false, true, false),
            _ => return Err(ModeError::Unknown(s.to_string())),
        };

        let mut plus = false;
        let mut seen_b = false;
        let mut seen_t = false;
        for modifier in chars {
            let seen = match modifier {
                '+' => &mut plus,
                'b' => &mut seen_b,
                't' => &mut seen_t,
                other => return Err(ModeError::Modifier(s.to_string(), other)),
            };
            if *seen {
                return Err(ModeError::Modifier(s.to_string(), modifier));
            }
            *seen = true;
        }

        Ok(Self {
            raw: s.to_string(),
            read: read || plus,
            write: write || plus,
            append,
            truncate,
            create,
            create_new,
        })
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
