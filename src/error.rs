//! Error types for unmwaw library.

use serde::Serialize;
use std::io;
use thiserror::Error;

/// Result type alias for unmwaw operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for unmwaw library.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not a document (or container) this library can decode.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A declared offset or length is not reachable in the stream.
    #[error("Invalid position {pos} (stream end {end})")]
    InvalidPosition { pos: i64, end: i64 },

    /// The stream's self-description is internally inconsistent.
    #[error("Structural mismatch at offset {offset}: {message}")]
    Structure { offset: i64, message: String },

    /// A well-formed record carries a tag this decoder does not know.
    #[error("Unknown tag {tag:#x} at offset {offset}")]
    UnknownTag { offset: i64, tag: u32 },

    /// The stream ended inside a record of known minimum size.
    #[error("Stream exhausted at offset {offset}: {needed} more bytes required")]
    StreamExhausted { offset: i64, needed: i64 },

    /// Property handler interchange buffer is malformed.
    #[error("Interchange buffer error at byte {offset}: {message}")]
    Codec { offset: usize, message: String },

    /// Invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Text encoding error.
    #[error("Text encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Builds a [`Error::Structure`] error.
    pub fn structure(offset: i64, message: impl Into<String>) -> Self {
        Error::Structure {
            offset,
            message: message.into(),
        }
    }

    /// Builds a [`Error::Codec`] error.
    pub fn codec(offset: usize, message: impl Into<String>) -> Self {
        Error::Codec {
            offset,
            message: message.into(),
        }
    }

    /// Returns the coarse category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::FileAccess,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::InvalidPosition { .. } => ErrorKind::Validation,
            Error::Structure { .. } | Error::Codec { .. } => ErrorKind::StructuralMismatch,
            Error::UnknownTag { .. } => ErrorKind::UnknownTag,
            Error::StreamExhausted { .. } => ErrorKind::StreamExhausted,
            Error::InvalidData(_) | Error::Encoding(_) => ErrorKind::StructuralMismatch,
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

/// Error taxonomy shared by every decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The file could not be read at all.
    FileAccess,
    /// The container or format is not supported.
    UnsupportedFormat,
    /// A declared offset/length is unreachable; recoverable locally.
    Validation,
    /// The binary self-description is inconsistent.
    StructuralMismatch,
    /// An unrecognized tag; always skipped.
    UnknownTag,
    /// End of stream inside a fixed-size record.
    StreamExhausted,
}

/// Result code surfaced by top-level parse entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseStatus {
    /// The document was decoded.
    Ok,
    /// The input could not be opened or read.
    FileAccessError,
    /// The document is corrupt beyond recovery.
    ParseError,
    /// The input is not a supported format.
    UnsupportedFormat,
}

impl ParseStatus {
    /// Returns the status for a parse result.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ParseStatus::Ok,
            Err(err) => ParseStatus::from(err),
        }
    }

    /// Process exit code used by command-line front-ends.
    pub fn exit_code(self) -> i32 {
        match self {
            ParseStatus::Ok => 0,
            _ => 1,
        }
    }
}

impl From<&Error> for ParseStatus {
    fn from(err: &Error) -> Self {
        match err.kind() {
            ErrorKind::FileAccess => ParseStatus::FileAccessError,
            ErrorKind::UnsupportedFormat => ParseStatus::UnsupportedFormat,
            _ => ParseStatus::ParseError,
        }
    }
}

impl std::fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseStatus::Ok => write!(f, "ok"),
            ParseStatus::FileAccessError => write!(f, "file access error"),
            ParseStatus::ParseError => write!(f, "parse error"),
            ParseStatus::UnsupportedFormat => write!(f, "unsupported format"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_errors() {
        let io: Result<()> = Err(Error::Io(io::Error::new(io::ErrorKind::NotFound, "gone")));
        assert_eq!(ParseStatus::of(&io), ParseStatus::FileAccessError);

        let bad: Result<()> = Err(Error::structure(12, "level jump"));
        assert_eq!(ParseStatus::of(&bad), ParseStatus::ParseError);

        let unsupported: Result<()> = Err(Error::UnsupportedFormat("AppleSingle v3".into()));
        assert_eq!(ParseStatus::of(&unsupported), ParseStatus::UnsupportedFormat);

        let ok: Result<u8> = Ok(1);
        assert_eq!(ParseStatus::of(&ok), ParseStatus::Ok);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ParseStatus::Ok.exit_code(), 0);
        assert_eq!(ParseStatus::ParseError.exit_code(), 1);
        assert_eq!(ParseStatus::FileAccessError.exit_code(), 1);
        assert_eq!(ParseStatus::UnsupportedFormat.exit_code(), 1);
    }
}
