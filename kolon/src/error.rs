//! `kolon` error types.
use std::{backtrace::Backtrace, fmt, str::Utf8Error};

use crate::{
    config::ConfigError,
    row::{DecodeError, RowNotFound},
};

/// A specialized [`Result`] type for `kolon` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible errors from `kolon`.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub(crate) fn row_not_found() -> Self {
        RowNotFound.into()
    }

    pub(crate) fn server(status: reqwest::StatusCode, body: String) -> Self {
        ErrorKind::ServerError { status, body }.into()
    }

    pub(crate) fn unknown_type(name: impl Into<String>) -> Self {
        ErrorKind::UnknownType(name.into()).into()
    }

    pub(crate) fn malformed_type(reason: impl Into<String>) -> Self {
        ErrorKind::MalformedType(reason.into()).into()
    }

    pub(crate) fn unexpected_eof() -> Self {
        ErrorKind::UnexpectedEof.into()
    }

    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        ErrorKind::Encoding(reason.into()).into()
    }

    pub(crate) fn out_of_range(reason: impl Into<String>) -> Self {
        ErrorKind::OutOfRange(reason.into()).into()
    }

    pub(crate) fn precision_loss(reason: impl Into<String>) -> Self {
        ErrorKind::PrecisionLoss(reason.into()).into()
    }

    pub(crate) fn null_in_non_nullable() -> Self {
        ErrorKind::NullInNonNullable.into()
    }

    pub(crate) fn trailing_garbage(extra_bytes: usize) -> Self {
        ErrorKind::TrailingGarbage { extra_bytes }.into()
    }

    pub(crate) fn empty_query() -> Self {
        ErrorKind::EmptyQuery.into()
    }
}

/// All possible error kinds from `kolon`.
pub enum ErrorKind {
    /// Connection, DNS, TLS, or I/O failure before a full response was read.
    Transport(reqwest::Error),
    /// Non-2xx HTTP response; carries the body verbatim.
    ServerError { status: reqwest::StatusCode, body: String },
    /// Malformed `Config`/connection URL.
    Config(ConfigError),
    /// Type-parser failure: argument list did not match the family's grammar.
    MalformedType(String),
    /// Type-parser failure: unrecognized family name.
    UnknownType(String),
    /// Wire data shorter than the schema implies (buffered mode).
    UnexpectedEof,
    /// Invalid UTF-8, malformed VarUInt, or an unmapped enum tag.
    Encoding(String),
    /// Host value does not fit the target column type.
    OutOfRange(String),
    /// Host value cannot be scaled into the target decimal without losing digits.
    PrecisionLoss(String),
    /// A `NULL` value was supplied for a non-`Nullable` column.
    NullInNonNullable,
    /// Bytes remained past the last complete row at stream end.
    TrailingGarbage { extra_bytes: usize },
    /// Row/column level decode failure.
    Decode(DecodeError),
    /// `fetchone`/`fetchval` found no row.
    RowNotFound(RowNotFound),
    /// Query string was empty or whitespace-only.
    EmptyQuery,
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<reqwest::Error>e => ErrorKind::Transport(e));
from!(<ConfigError>e => ErrorKind::Config(e));
from!(<Utf8Error>e => ErrorKind::Decode(DecodeError::Utf8(e)));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<RowNotFound>e => ErrorKind::RowNotFound(e));

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::ServerError { status, body } => write!(f, "server returned {status}: {body}"),
            Self::Config(e) => e.fmt(f),
            Self::MalformedType(reason) => write!(f, "malformed type expression: {reason}"),
            Self::UnknownType(name) => write!(f, "unknown type: {name:?}"),
            Self::UnexpectedEof => write!(f, "unexpected end of stream"),
            Self::Encoding(reason) => write!(f, "encoding error: {reason}"),
            Self::OutOfRange(reason) => write!(f, "value out of range: {reason}"),
            Self::PrecisionLoss(reason) => write!(f, "precision loss: {reason}"),
            Self::NullInNonNullable => write!(f, "NULL supplied for a non-Nullable column"),
            Self::TrailingGarbage { extra_bytes } => {
                write!(f, "{extra_bytes} trailing byte(s) after the last complete row")
            }
            Self::Decode(e) => e.fmt(f),
            Self::RowNotFound(e) => e.fmt(f),
            Self::EmptyQuery => write!(f, "query string is empty"),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
