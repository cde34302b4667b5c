//! Error types for this crate.

use std::fmt::Display;

/// A convenience type alias for a `Result` with an `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    data: ErrorData,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// A receiver or callback of the wrong type was supplied.
    InvalidArgument,
    /// The dispatcher has been torn down and no longer accepts calls.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ErrorData {
    Simple(ErrorKind),
    Message(ErrorKind, &'static str),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            ErrorData::Simple(kind) => kind.fmt(f),
            ErrorData::Message(_, message) => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            data: ErrorData::Simple(kind),
        }
    }
}

impl Error {
    pub(crate) fn with_message(kind: ErrorKind, message: &'static str) -> Self {
        Error {
            data: ErrorData::Message(kind, message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.data {
            ErrorData::Simple(kind) | ErrorData::Message(kind, _) => *kind,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidArgument => f.write_str("invalid argument"),
            ErrorKind::Aborted => f.write_str("dispatcher aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_overrides_kind_description() {
        let err = Error::from(ErrorKind::Aborted);
        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert_eq!(err.to_string(), "dispatcher aborted");

        let err = Error::with_message(ErrorKind::InvalidArgument, "callback must be a function");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "callback must be a function");
    }
}
