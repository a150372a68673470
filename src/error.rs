//! Crate-wide error type.
//!
//! Every fallible operation in `imagecore` — PE parsing, segment rebuilding, metadata decoding,
//! and x86 encoding/decoding — returns [`Result`]. Parse errors carry the failing byte offset (or
//! RVA, where that is the more meaningful coordinate) so that callers and tests can match on a
//! stable location, not just a message.

use alloc::format;
use alloc::string::String;
use core::fmt;
use core::result;

/// The kind of failure that occurred, independent of where it occurred.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// A read or write ran past the end of the reader/writer's range.
    OutOfBounds,
    /// A PE-level structural check failed: bad magic, signature mismatch, impossible header
    /// field.
    BadImage,
    /// A CLI metadata structural check failed: undefined table id, row id out of range,
    /// signature under/over-consumed.
    MalformedMetadata,
    /// An x86 opcode is unknown, or a ModR/M+SIB combination is not representable.
    InvalidEncoding,
    /// The caller supplied a segment tree or instruction that violates a documented
    /// precondition (e.g. two sections overlapping in RVA space).
    InvariantViolation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::OutOfBounds => "out of bounds",
            ErrorKind::BadImage => "bad image",
            ErrorKind::MalformedMetadata => "malformed metadata",
            ErrorKind::InvalidEncoding => "invalid encoding",
            ErrorKind::InvariantViolation => "invariant violation",
        };
        f.write_str(s)
    }
}

/// The crate's error type.
///
/// Constructed with a [`ErrorKind`], a human-readable message, and an optional byte offset (or
/// RVA) at which the failure was detected.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    offset: Option<u64>,
}

impl Error {
    /// Construct an error with no associated offset.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            offset: None,
        }
    }

    /// Construct an error that also records the byte offset (or RVA) at which it occurred.
    pub fn at(kind: ErrorKind, message: impl Into<String>, offset: u64) -> Self {
        Error {
            kind,
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Shorthand for [`ErrorKind::OutOfBounds`].
    pub fn out_of_bounds(offset: u64, len: usize) -> Self {
        Error::at(
            ErrorKind::OutOfBounds,
            format!("attempted to access byte {offset:#x}, range has length {len:#x}"),
            offset,
        )
    }

    /// Shorthand for [`ErrorKind::BadImage`].
    pub fn bad_image(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::BadImage, message)
    }

    /// Shorthand for [`ErrorKind::MalformedMetadata`].
    pub fn malformed_metadata(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::MalformedMetadata, message)
    }

    /// Shorthand for [`ErrorKind::InvalidEncoding`].
    pub fn invalid_encoding(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidEncoding, message)
    }

    /// Shorthand for [`ErrorKind::InvariantViolation`].
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvariantViolation, message)
    }

    /// The kind of failure.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The byte offset (or RVA) the failure was detected at, if one was recorded.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{}: {} (at {:#x})", self.kind, self.message, offset),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Self {
        match err {
            scroll::Error::TooBig { size, len } => Error::at(
                ErrorKind::OutOfBounds,
                format!("requested {size} bytes, only {len} available"),
                len as u64,
            ),
            scroll::Error::BadOffset(offset) => {
                Error::at(ErrorKind::OutOfBounds, "bad offset", offset as u64)
            }
            scroll::Error::BadInput { size, msg } => Error::at(
                ErrorKind::MalformedMetadata,
                format!("bad input: {msg}"),
                size as u64,
            ),
            scroll::Error::Custom(msg) => Error::new(ErrorKind::MalformedMetadata, msg),
            other => Error::new(ErrorKind::OutOfBounds, format!("{other}")),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = result::Result<T, Error>;
