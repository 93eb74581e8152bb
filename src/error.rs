//! Structured error chain.
//!
//! The C `libbfio` this crate is modeled on never raises: every operation
//! writes a structured error frame into a caller-provided sink and returns a
//! sentinel failure code. The idiomatic Rust rendering of "write-only sink"
//! is an accumulating [`BfioError`] that callers propagate with `?`; each
//! layer that fails pushes a frame onto the chain rather than replacing it,
//! matching the "no layer swallows" propagation policy.

use std::fmt;

use thiserror::Error;

/// Coarse category of a failure, matching the domains enumerated for the
/// core's error taxonomy.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Bad argument: null pointer, invalid size, invalid flag combination,
    /// an out-parameter that was already set.
    #[error("arguments")]
    Arguments,
    /// Operation invalid in the object's current state (close on closed,
    /// open on open, read on a closed non-pooled handle).
    #[error("runtime")]
    Runtime,
    /// Underlying OS failure.
    #[error("io")]
    Io,
    /// Allocation or copy failure.
    #[error("memory")]
    Memory,
    /// Codepage transcoding failure.
    #[error("conversion")]
    Conversion,
}

/// Specific failure kind within a [`ErrorDomain`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value (argument, flag combination) was invalid.
    #[error("invalid value")]
    InvalidValue,
    /// An out-parameter or slot was already set to a non-null value.
    #[error("already set")]
    AlreadySet,
    /// A getter failed.
    #[error("get failed")]
    GetFailed,
    /// A setter failed.
    #[error("set failed")]
    SetFailed,
    /// `open` failed.
    #[error("open failed")]
    OpenFailed,
    /// `close` failed.
    #[error("close failed")]
    CloseFailed,
    /// `read` failed.
    #[error("read failed")]
    ReadFailed,
    /// `write` failed.
    #[error("write failed")]
    WriteFailed,
    /// `seek` failed.
    #[error("seek failed")]
    SeekFailed,
    /// Allocation failed.
    #[error("insufficient memory")]
    InsufficientMemory,
    /// A `memcpy`-like copy failed or was out of bounds.
    #[error("copy failed")]
    CopyFailed,
    /// Anything not covered above.
    #[error("generic")]
    Generic,
}

/// One appended record in an error chain.
///
/// Mirrors the C library's error frame: a domain, a kind, and a free-text
/// message. The core only ever appends frames; it never reads back or
/// mutates a frame once pushed.
#[derive(Debug, Clone)]
pub struct ErrorFrame {
    /// Which subsystem the failure originated in.
    pub domain: ErrorDomain,
    /// What kind of failure it was.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorFrame {
    /// Build a new frame.
    pub fn new(domain: ErrorDomain, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            domain,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.domain, self.kind, self.message)
    }
}

impl std::error::Error for ErrorFrame {}

/// A write-only appender of error frames.
///
/// Implemented for [`Vec<ErrorFrame>`] and for [`BfioError`] itself, so a
/// caller embedding this crate behind a C-compatible shim can build up a
/// sink in the literal append-only shape the original API exposes, without
/// the core itself depending on that shape.
pub trait ErrorSink {
    /// Append a frame. Never fails, never inspects prior frames.
    fn push(&mut self, frame: ErrorFrame);
}

impl ErrorSink for Vec<ErrorFrame> {
    fn push(&mut self, frame: ErrorFrame) {
        Vec::push(self, frame);
    }
}

/// The core's error type: a non-empty chain of [`ErrorFrame`]s, most recent
/// (innermost) first.
#[derive(Debug, Clone)]
pub struct BfioError {
    frames: Vec<ErrorFrame>,
}

impl BfioError {
    /// Start a new chain with a single frame.
    pub fn new(domain: ErrorDomain, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            frames: vec![ErrorFrame::new(domain, kind, message)],
        }
    }

    /// Push another frame onto this chain (outermost context goes last).
    #[must_use]
    pub fn context(mut self, domain: ErrorDomain, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.frames.push(ErrorFrame::new(domain, kind, message));
        self
    }

    /// The most specific (first) frame.
    pub fn frame(&self) -> &ErrorFrame {
        &self.frames[0]
    }

    /// The domain of the most specific frame.
    pub fn domain(&self) -> ErrorDomain {
        self.frames[0].domain
    }

    /// The kind of the most specific frame.
    pub fn kind(&self) -> ErrorKind {
        self.frames[0].kind
    }

    /// Iterate frames from most specific to least specific.
    pub fn frames(&self) -> impl Iterator<Item = &ErrorFrame> {
        self.frames.iter()
    }
}

impl ErrorSink for BfioError {
    fn push(&mut self, frame: ErrorFrame) {
        self.frames.push(frame);
    }
}

impl fmt::Display for BfioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frames[0])
    }
}

impl std::error::Error for BfioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.frames
            .get(1)
            .map(|frame| frame as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for BfioError {
    fn from(err: std::io::Error) -> Self {
        BfioError::new(ErrorDomain::Io, ErrorKind::Generic, err.to_string())
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, BfioError>;
