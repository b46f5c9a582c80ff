use thiserror::Error;

use crate::cursor::Position;

/// Stable classification of every failure the converter can report.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    EndOfInput,
    StreamError,
    InvalidUtf8,
    InvalidPushback,
    MalformedTimestamp,
    MalformedDb,
    MalformedQuoting,
    UnexpectedCharacter,
    TokenTooLong,
    EncodingError,
}

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("end of input at {position}")]
    EndOfInput { position: Position },
    #[error("failed reading input at {position}: {source}")]
    Io {
        position: Position,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid UTF-8 in input at {position}")]
    InvalidUtf8 { position: Position },
    #[error("push back requested with no character to return")]
    InvalidPushback,
}

impl CursorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EndOfInput { .. } => ErrorKind::EndOfInput,
            Self::Io { .. } => ErrorKind::StreamError,
            Self::InvalidUtf8 { .. } => ErrorKind::InvalidUtf8,
            Self::InvalidPushback => ErrorKind::InvalidPushback,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum UnquoteError {
    #[error("missing opening quote")]
    MissingOpeningQuote,
    #[error("missing closing quote")]
    MissingClosingQuote,
    #[error("unescaped quote at byte {index}")]
    UnescapedQuote { index: usize },
    #[error("raw newline at byte {index}")]
    RawNewline { index: usize },
    #[error("dangling backslash at end of string")]
    DanglingBackslash,
    #[error("unknown escape sequence \\{escape} at byte {index}")]
    UnknownEscape { escape: char, index: usize },
    #[error("invalid \\x escape at byte {index}")]
    InvalidHexEscape { index: usize },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("malformed timestamp {text:?} at {position}")]
    MalformedTimestamp { text: String, position: Position },
    #[error("malformed db {text:?} at {position}")]
    MalformedDb { text: String, position: Position },
    #[error("malformed quoted string {token:?} at {position}: {source}")]
    MalformedQuoting {
        token: String,
        position: Position,
        #[source]
        source: UnquoteError,
    },
    #[error("expected {expected:?}, found {found:?} at {position}")]
    UnexpectedCharacter {
        expected: char,
        found: char,
        position: Position,
    },
    #[error("{field} longer than {max_chars} characters at {position}")]
    TokenTooLong {
        field: &'static str,
        max_chars: usize,
        position: Position,
    },
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Cursor(err) => err.kind(),
            Self::MalformedTimestamp { .. } => ErrorKind::MalformedTimestamp,
            Self::MalformedDb { .. } => ErrorKind::MalformedDb,
            Self::MalformedQuoting { .. } => ErrorKind::MalformedQuoting,
            Self::UnexpectedCharacter { .. } => ErrorKind::UnexpectedCharacter,
            Self::TokenTooLong { .. } => ErrorKind::TokenTooLong,
        }
    }

    /// Where in the input the failure was detected, when known.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Cursor(CursorError::EndOfInput { position })
            | Self::Cursor(CursorError::Io { position, .. })
            | Self::Cursor(CursorError::InvalidUtf8 { position })
            | Self::MalformedTimestamp { position, .. }
            | Self::MalformedDb { position, .. }
            | Self::MalformedQuoting { position, .. }
            | Self::UnexpectedCharacter { position, .. }
            | Self::TokenTooLong { position, .. } => Some(*position),
            Self::Cursor(CursorError::InvalidPushback) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to parse monitor stream: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to encode event from line {line_number}: {source}")]
    Encode {
        line_number: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed writing output: {0}")]
    Write(#[source] std::io::Error),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(err) => err.kind(),
            Self::Encode { .. } => ErrorKind::EncodingError,
            Self::Write(_) => ErrorKind::StreamError,
        }
    }
}
