//! Error reporting for the storage substrate.
//!
//! Every fallible operation returns [`Result`]. An [`Error`] carries exactly one
//! [`ErrorKind`] plus a diagnostic made of the origin (`file:line`), the symbolic
//! code and a message, rendered as `origin: CODE: message`.

use std::borrow::Cow;
use std::collections::TryReserveError;
use std::fmt;
use std::io;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorKind {
    /// The operation succeeded.
    NoError,
    /// An object was not ready for the requested operation.
    StateError,
    /// An invalid null pointer was supplied.
    NullError,
    /// An operation tried to access an out-of-range address.
    BoundError,
    /// An out-of-range value appeared in an operation.
    RangeError,
    /// An undefined code appeared in an operation.
    CodeError,
    /// A size exceeded a library limitation.
    SizeError,
    /// A memory allocation failed.
    MemoryError,
    /// An I/O operation failed.
    IoError,
    /// Input was in an invalid format.
    FormatError,
    /// Anything else.
    UnknownError,
}

const ALL_KINDS: [ErrorKind; 11] = [
    ErrorKind::NoError,
    ErrorKind::StateError,
    ErrorKind::NullError,
    ErrorKind::BoundError,
    ErrorKind::RangeError,
    ErrorKind::CodeError,
    ErrorKind::SizeError,
    ErrorKind::MemoryError,
    ErrorKind::IoError,
    ErrorKind::FormatError,
    ErrorKind::UnknownError,
];

impl ErrorKind {
    /// Symbolic code used in diagnostics, e.g. `STATE_ERROR`.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::NoError => "NO_ERROR",
            ErrorKind::StateError => "STATE_ERROR",
            ErrorKind::NullError => "NULL_ERROR",
            ErrorKind::BoundError => "BOUND_ERROR",
            ErrorKind::RangeError => "RANGE_ERROR",
            ErrorKind::CodeError => "CODE_ERROR",
            ErrorKind::SizeError => "SIZE_ERROR",
            ErrorKind::MemoryError => "MEMORY_ERROR",
            ErrorKind::IoError => "IO_ERROR",
            ErrorKind::FormatError => "FORMAT_ERROR",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Parse a symbolic code back into a kind.
    ///
    /// Unrecognised codes map to [`ErrorKind::UnknownError`].
    pub fn from_code(code: &str) -> Self {
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.code() == code)
            .unwrap_or(ErrorKind::UnknownError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure with its diagnostic.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: &'static str,
    message: Cow<'static, str>,
    source: Option<io::Error>,
}

impl Error {
    /// Create an error. Prefer the crate-internal `fail!` macro, which fills in
    /// the origin automatically.
    pub fn new(
        kind: ErrorKind,
        origin: &'static str,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, source: io::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// The failure category.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Where the error was raised, as `file:line`.
    #[inline]
    pub fn origin(&self) -> &'static str {
        self.origin
    }

    /// Human-readable message without origin or code.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Recover the kind from a rendered diagnostic (`origin: CODE: message`).
    ///
    /// An empty diagnostic means success; anything unparseable is
    /// [`ErrorKind::UnknownError`].
    pub fn parse_kind(diagnostic: &str) -> ErrorKind {
        if diagnostic.is_empty() {
            return ErrorKind::NoError;
        }
        let Some((_, rest)) = diagnostic.split_once(": ") else {
            return ErrorKind::UnknownError;
        };
        let code = rest.split_once(": ").map_or(rest, |(code, _)| code);
        ErrorKind::from_code(code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.origin, self.kind.code(), self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        let message = err.to_string();
        Error::new(ErrorKind::IoError, concat!(file!(), ":", line!()), message).with_source(err)
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::new(
            ErrorKind::MemoryError,
            concat!(file!(), ":", line!()),
            format!("allocation failed: {}", err),
        )
    }
}

/// A specialized result for substrate operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Build an [`Error`] stamped with the current `file:line`.
///
/// ```ignore
/// return Err(fail!(StateError, "failed to push bit: already built"));
/// ```
macro_rules! fail {
    ($kind:ident, $msg:literal) => {
        $crate::error::Error::new(
            $crate::error::ErrorKind::$kind,
            concat!(file!(), ":", line!()),
            $msg,
        )
    };
    ($kind:ident, $fmt:literal, $($arg:tt)+) => {
        $crate::error::Error::new(
            $crate::error::ErrorKind::$kind,
            concat!(file!(), ":", line!()),
            format!($fmt, $($arg)+),
        )
    };
}

pub(crate) use fail;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_origin_code_message() {
        let err = fail!(StateError, "failed to map objects: not ready");
        let text = err.to_string();
        assert!(text.starts_with("src/error.rs:"), "{}", text);
        assert!(text.ends_with(": STATE_ERROR: failed to map objects: not ready"));
        assert_eq!(err.kind(), ErrorKind::StateError);
        assert_eq!(err.message(), "failed to map objects: not ready");
    }

    #[test]
    fn test_formatted_message() {
        let err = fail!(BoundError, "need {} bytes, have {}", 8, 3);
        assert_eq!(err.message(), "need 8 bytes, have 3");
    }

    #[test]
    fn test_code_roundtrip() {
        for kind in ALL_KINDS {
            assert_eq!(ErrorKind::from_code(kind.code()), kind);
        }
        assert_eq!(ErrorKind::from_code("NOPE"), ErrorKind::UnknownError);
    }

    #[test]
    fn test_parse_kind_from_diagnostic() {
        let err = fail!(FormatError, "num_1s > size");
        assert_eq!(Error::parse_kind(&err.to_string()), ErrorKind::FormatError);
        assert_eq!(Error::parse_kind(""), ErrorKind::NoError);
        assert_eq!(Error::parse_kind("garbage"), ErrorKind::UnknownError);
        assert_eq!(
            Error::parse_kind("a.rs:1: SIZE_ERROR"),
            ErrorKind::SizeError
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io.into();
        assert_eq!(err.kind(), ErrorKind::IoError);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_try_reserve_conversion() {
        let mut v: Vec<u64> = Vec::new();
        let reserve = v.try_reserve_exact(usize::MAX);
        let err: Error = reserve.unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MemoryError);
    }
}
