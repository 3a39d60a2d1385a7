//! `pgembed` error types.
use std::{backtrace::Backtrace, fmt};

use crate::{common::ByteStr, connection::ParseError};

/// A specialized [`Result`] type for `pgembed` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `pgembed` library.
///
/// Every error is also recorded in the thread [`Sqlca`][crate::sqlca::Sqlca]
/// at the time it is raised.
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

    /// Prefix the error message with `context`.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// The numeric `sqlcode` of this error.
    pub fn sqlcode(&self) -> i64 {
        match &self.kind {
            ErrorKind::Sql(e) => e.code,
            ErrorKind::Backend(e) => e.code,
            ErrorKind::Config(_) => crate::sqlca::code::CONNECT,
        }
    }

    /// The SQLSTATE of this error.
    pub fn sqlstate(&self) -> &str {
        match &self.kind {
            ErrorKind::Sql(e) => e.state,
            ErrorKind::Backend(e) => &e.state,
            ErrorKind::Config(_) => crate::sqlca::state::UNABLE_TO_ESTABLISH_CONNECTION,
        }
    }

    /// Returns `true` when the runtime reported no data found.
    pub fn is_not_found(&self) -> bool {
        self.sqlcode() == crate::sqlca::code::NOT_FOUND
    }
}

/// All possible error kind from `pgembed` library.
pub enum ErrorKind {
    /// Error raised by the runtime itself.
    Sql(SqlError),
    /// Error reported by the server.
    Backend(BackendError),
    Config(ParseError),
}

/// Error raised by the runtime.
pub struct SqlError {
    code: i64,
    state: &'static str,
    message: String,
}

impl SqlError {
    pub(crate) fn new(code: i64, state: &'static str, message: String) -> Self {
        Self { code, state, message }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn state(&self) -> &'static str {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error reported by the server or the wire library.
pub struct BackendError {
    code: i64,
    state: ByteStr,
    message: String,
}

impl BackendError {
    pub(crate) fn new(code: i64, state: ByteStr, message: String) -> Self {
        Self { code, state, message }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }
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
from!(<SqlError>e => ErrorKind::Sql(e));
from!(<BackendError>e => ErrorKind::Backend(e));
from!(<ParseError>e => ErrorKind::Config(e));

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
            Self::Sql(e) => e.fmt(f),
            Self::Backend(e) => e.fmt(f),
            Self::Config(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.state, self.message)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.state, self.message)
    }
}
