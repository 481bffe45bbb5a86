use std::fmt;

/// A recoverable mistake in what the user typed at the prompt.
///
/// The REPL driver prints one diagnostic line for each of these and keeps
/// reading; nothing below this layer ever sees a [`UserError`] propagate
/// past the statement that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    UnrecognizedCommand(String),
    UnrecognizedStatement(String),
    SyntaxError,
    StringTooLong,
    DuplicateKey,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UserError::UnrecognizedCommand(line) => {
                write!(f, "Unrecognized command '{}'", line)
            }
            UserError::UnrecognizedStatement(line) => {
                write!(f, "Unrecognized keyword at start of '{}'.", line)
            }
            UserError::SyntaxError => write!(f, "Syntax error. Could not parse statement."),
            UserError::StringTooLong => write!(f, "String is too long."),
            UserError::DuplicateKey => write!(f, "Error: Duplicate key."),
        }
    }
}

/// Everything that can go wrong in the storage core.
///
/// [`Error::User`] is the only recoverable variant; the driver maps it to a
/// single printed line and continues the loop. Every other variant is fatal:
/// the driver prints a one-line diagnostic to stderr and exits nonzero. The
/// core never calls `process::exit` or panics to signal these — it always
/// returns a `Result`, so the choice of continue-vs-abort stays with the
/// driver.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Pager/page-cache misuse: out-of-range page number, flush of an empty
    /// slot, misaligned file length at open.
    Storage(String),
    /// A structural ceiling was hit: internal-node overflow, `MAX_PAGES`
    /// exceeded.
    Capacity(String),
    /// An invariant the tree relies on was found violated.
    Integrity(String),
    User(UserError),
}

impl Error {
    /// Whether the driver should print a line and keep reading, as opposed
    /// to aborting the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::User(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{}", e),
            Error::Storage(msg) => write!(f, "{}", msg),
            Error::Capacity(msg) => write!(f, "{}", msg),
            Error::Integrity(msg) => write!(f, "{}", msg),
            Error::User(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<UserError> for Error {
    fn from(err: UserError) -> Error {
        Error::User(err)
    }
}

/// Shorthand for building a tagged `Error` from a format string, e.g.
/// `err!(Storage, "page {} out of range", n)`.
#[macro_export]
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}
