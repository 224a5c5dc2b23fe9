//! Error types for serialization sessions.
//!
//! Failures come in two disjoint classes:
//!
//! - **Hard errors** ([`Error`]): malformed input such as unbalanced JSON
//!   brackets, a truncated binary frame or an unknown magic prefix. These abort
//!   the session and are returned as `Err`.
//! - **Soft errors** ([`ErrorLog`]): field-level problems such as a type
//!   mismatch, a missing required field or an unresolvable type alias. These are
//!   recorded while the walk continues, so a caller sees every problem of a
//!   document in one pass.
//!
//! ## Examples
//!
//! ```rust
//! use omniser::json::JsonDocument;
//!
//! let result = JsonDocument::parse("{\"a\": [1, 2}");
//! assert!(result.is_err());
//!
//! if let Err(err) = result {
//!     eprintln!("Parse error: {}", err);
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Hard failures that abort a serialization session.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Syntax error in a text document
    #[error("Syntax error at line {line}, column {col}: {msg}")]
    Syntax { line: usize, col: usize, msg: String },

    /// Structurally invalid data for a given wire format
    #[error("Invalid {format} data: {msg}")]
    InvalidFormat { format: &'static str, msg: String },

    /// Input ended in the middle of a value
    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    /// The input does not start with any known magic prefix
    #[error("Unrecognized format: {0}")]
    UnknownFormat(String),

    /// Compression or decompression failure
    #[error("Compression error: {0}")]
    Compression(String),

    /// Invalid Base64 payload
    #[error("Base64 error: {0}")]
    Base64(String),

    /// XML reader or writer failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Soft errors promoted to a hard failure by [`ErrorLog::into_result`]
    #[error("{count} field error(s):\n{summary}")]
    Field { count: usize, summary: String },

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a syntax error with line and column information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use omniser::Error;
    ///
    /// let err = Error::syntax(10, 5, "unexpected token");
    /// assert!(err.to_string().contains("line 10"));
    /// ```
    pub fn syntax(line: usize, col: usize, msg: &str) -> Self {
        Error::Syntax {
            line,
            col,
            msg: msg.to_string(),
        }
    }

    /// Creates an error for structurally invalid data in the named format.
    pub fn invalid_format(format: &'static str, msg: impl fmt::Display) -> Self {
        Error::InvalidFormat {
            format,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(expected: &str) -> Self {
        Error::UnexpectedEof {
            expected: expected.to_string(),
        }
    }

    /// Creates an I/O error.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates an XML error.
    pub fn xml(msg: impl fmt::Display) -> Self {
        Error::Xml(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use omniser::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Ordered list of soft, field-level errors collected by one session.
///
/// # Examples
///
/// ```rust
/// use omniser::ErrorLog;
///
/// let mut log = ErrorLog::new();
/// assert!(!log.has_errors());
///
/// log.record("player.hp: expected i32, found string");
/// log.record("player.name: missing required field");
///
/// assert!(log.has_errors());
/// assert_eq!(log.len(), 2);
/// assert_eq!(
///     log.summary(),
///     "player.hp: expected i32, found string\nplayer.name: missing required field"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    messages: Vec<String>,
}

impl ErrorLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one formatted message.
    pub fn record(&mut self, message: impl fmt::Display) {
        self.messages.push(message.to_string());
    }

    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.messages.iter()
    }

    /// All messages joined with newlines.
    #[must_use]
    pub fn summary(&self) -> String {
        self.messages.join("\n")
    }

    /// Appends every message of `other`.
    pub fn extend(&mut self, other: ErrorLog) {
        self.messages.extend(other.messages);
    }

    /// Returns `value` if no error was recorded, otherwise an [`Error::Field`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Field`] carrying the summary when the log is not empty.
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.messages.is_empty() {
            Ok(value)
        } else {
            Err(Error::Field {
                count: self.messages.len(),
                summary: self.summary(),
            })
        }
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl<'a> IntoIterator for &'a ErrorLog {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result_with_errors() {
        let mut log = ErrorLog::new();
        log.record("a: missing required field");
        let err = log.into_result(()).unwrap_err();
        match err {
            Error::Field { count, summary } => {
                assert_eq!(count, 1);
                assert_eq!(summary, "a: missing required field");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_into_result_clean() {
        assert_eq!(ErrorLog::new().into_result(7).unwrap(), 7);
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io.into();
        assert!(err.to_string().contains("short read"));
    }
}
