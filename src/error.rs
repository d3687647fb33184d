//! `pgfront` error types.
use std::{backtrace::Backtrace, fmt, io, str::Utf8Error};

use crate::{
    common::ByteStr,
    connection::ParseError,
    decode::DecodeError,
    encode::EncodeError,
    response::Diagnostic,
    row::IndexError,
};

/// A specialized [`Result`] type for `pgfront` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from the `pgfront` library.
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

    /// The server diagnostic, when the command failed on the server.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match &self.kind {
            ErrorKind::Database(diagnostic) => Some(diagnostic),
            _ => None,
        }
    }
}

/// All possible error kind from the `pgfront` library.
pub enum ErrorKind {
    /// Malformed configuration url.
    Config(ParseError),
    /// The transport could not establish a connection.
    Connect(ConnectError),
    /// The transport failed while submitting a command.
    Io(io::Error),
    /// The server reported the command failed.
    Database(Diagnostic),
    /// A parameter could not be bound.
    Encode(EncodeError),
    /// A cell could not be decoded.
    Decode(DecodeError),
    /// A row or column access out of range.
    Index(IndexError),
    /// Non utf8 text where the protocol requires utf8.
    Utf8(Utf8Error),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<ConnectError>e => ErrorKind::Connect(e));
from!(<io::Error>e => ErrorKind::Io(e));
from!(<Diagnostic>e => ErrorKind::Database(e));
from!(<EncodeError>e => ErrorKind::Encode(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<IndexError>e => ErrorKind::Index(e));
from!(<Utf8Error>e => ErrorKind::Utf8(e));

impl std::error::Error for Error { }

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

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Connect(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Database(e) => e.fmt(f),
            Self::Encode(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::Index(e) => e.fmt(f),
            Self::Utf8(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// An error when failing to establish a connection.
///
/// Owns the transport's diagnostic text until dropped. Connecting again
/// with different parameters is always allowed.
pub struct ConnectError {
    message: ByteStr,
}

impl ConnectError {
    /// Wrap the transport's connection diagnostic.
    pub fn new(message: impl Into<ByteStr>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for ConnectError { }

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
