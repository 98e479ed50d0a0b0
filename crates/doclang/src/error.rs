//! Error handling.
//!
//! Every component reports errors through [ParseError]. The parser driver
//! annotates errors with the source location (file, line, column) before
//! they leave `advance()`, so the component that raises an error does not
//! need to know where the input came from.
//!
//! Recovery is the caller's responsibility, per file: a malformed block is
//! isolated with `recover()` and the remaining blocks still parse.

use crate::input::Location;
use doccraft_stdext::color::Colorize;

pub type Result<T> = std::result::Result<T, Box<ParseError>>;

/// An error annotated with the source location at which it was detected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// A control sequence appeared where only character data is valid.
    UnexpectedControlSequence { name: String },
    /// A control sequence that is neither a macro nor a built-in command.
    UnknownControlSequence {
        name: String,
        /// Close matches among the defined names, best first.
        suggestions: Vec<String>,
    },
    /// The token after the call primitive was not a control sequence.
    ExpectedControlSequence { found: String },
    /// A recognized command reached a builder that does not implement it.
    BadControlSequence { name: String },
    /// A command's semantic preconditions failed.
    BadCall { command: String, reason: String },
    /// A character with the invalid category was read.
    InvalidCharacter { character: char },
    /// An input file could not be read.
    Io { path: String, message: String },
}

impl ParseError {
    pub fn new(kind: ErrorKind) -> Box<ParseError> {
        Box::new(ParseError {
            kind,
            location: None,
        })
    }

    /// Attach a location, unless one is already attached.
    ///
    /// The innermost annotation wins: an error that crossed an `\input`
    /// boundary keeps the location of the injected document.
    pub fn at(mut self: Box<Self>, location: Location) -> Box<Self> {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn bad_call<C: Into<String>, R: Into<String>>(command: C, reason: R) -> Box<ParseError> {
        ParseError::new(ErrorKind::BadCall {
            command: command.into(),
            reason: reason.into(),
        })
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", "error".bright_red().bold(), self.kind)?;
        if let Some(location) = &self.location {
            write!(f, "\n  {} {}", "-->".bright_blue(), location)?;
        }
        if let ErrorKind::UnknownControlSequence { suggestions, .. } = &self.kind {
            if let Some(best) = suggestions.first() {
                write!(
                    f,
                    "\n  {} did you mean \\{}?",
                    "=".bright_blue(),
                    best.clone().bold()
                )?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UnexpectedControlSequence { name } => {
                write!(f, "unexpected control sequence \\{name}")
            }
            ErrorKind::UnknownControlSequence { name, .. } => {
                write!(f, "unknown control sequence \\{name}")
            }
            ErrorKind::ExpectedControlSequence { found } => {
                write!(f, "expected a control sequence, found `{found}`")
            }
            ErrorKind::BadControlSequence { name } => {
                write!(f, "the command \\{name} cannot be used here")
            }
            ErrorKind::BadCall { command, reason } => {
                write!(f, "bad \\{command} command: {reason}")
            }
            ErrorKind::InvalidCharacter { character } => {
                write!(f, "invalid character {character:?}")
            }
            ErrorKind::Io { path, message } => {
                write!(f, "cannot read {path}: {message}")
            }
        }
    }
}

impl std::error::Error for ParseError {}
