//! Error types for the protocol core.

use std::collections::HashMap;
use thiserror::Error;

/// Result type for pglib-core operations.
pub type Result<T> = core::result::Result<T, Error>;

/// PostgreSQL error/notice field type codes, per the ErrorResponse/NoticeResponse wire format.
pub mod field_type {
    pub const SEVERITY: u8 = b'S';
    pub const SEVERITY_V: u8 = b'V';
    pub const CODE: u8 = b'C';
    pub const MESSAGE: u8 = b'M';
    pub const DETAIL: u8 = b'D';
    pub const HINT: u8 = b'H';
    pub const POSITION: u8 = b'P';
    pub const INTERNAL_POSITION: u8 = b'p';
    pub const INTERNAL_QUERY: u8 = b'q';
    pub const WHERE: u8 = b'W';
    pub const SCHEMA: u8 = b's';
    pub const TABLE: u8 = b't';
    pub const COLUMN: u8 = b'c';
    pub const DATA_TYPE: u8 = b'd';
    pub const CONSTRAINT: u8 = b'n';
    pub const FILE: u8 = b'F';
    pub const LINE: u8 = b'L';
    pub const ROUTINE: u8 = b'R';
}

/// A PostgreSQL ErrorResponse or NoticeResponse, keyed by field type byte.
///
/// This is the `ErrorDict`/`NoticeDict` of the data model: both messages share
/// the same field grammar, so one type serves both.
#[derive(Debug, Clone, Default)]
pub struct ErrorDict(pub(crate) HashMap<u8, String>);

impl ErrorDict {
    pub fn new(fields: HashMap<u8, String>) -> Self {
        Self(fields)
    }

    /// Severity (localized): ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG.
    pub fn severity(&self) -> &str {
        self.0.get(&field_type::SEVERITY).map_or("", |s| s.as_str())
    }

    /// Severity (non-localized, PostgreSQL 9.6+, never translated).
    pub fn severity_v(&self) -> &str {
        self.0
            .get(&field_type::SEVERITY_V)
            .map_or("", |s| s.as_str())
    }

    /// SQLSTATE error code (5 characters).
    pub fn code(&self) -> &str {
        self.0.get(&field_type::CODE).map_or("", |s| s.as_str())
    }

    /// Primary human-readable error message.
    pub fn message(&self) -> &str {
        self.0.get(&field_type::MESSAGE).map_or("", |s| s.as_str())
    }

    pub fn detail(&self) -> Option<&str> {
        self.0.get(&field_type::DETAIL).map(String::as_str)
    }

    pub fn hint(&self) -> Option<&str> {
        self.0.get(&field_type::HINT).map(String::as_str)
    }

    /// 1-based cursor position within the submitted query string.
    pub fn position(&self) -> Option<u32> {
        self.0.get(&field_type::POSITION).and_then(|s| s.parse().ok())
    }

    pub fn table(&self) -> Option<&str> {
        self.0.get(&field_type::TABLE).map(String::as_str)
    }

    pub fn column(&self) -> Option<&str> {
        self.0.get(&field_type::COLUMN).map(String::as_str)
    }

    pub fn constraint(&self) -> Option<&str> {
        self.0.get(&field_type::CONSTRAINT).map(String::as_str)
    }

    /// Look up any field by its raw type byte.
    pub fn get(&self, field_type: u8) -> Option<&str> {
        self.0.get(&field_type).map(String::as_str)
    }
}

impl std::fmt::Display for ErrorDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (SQLSTATE {})", self.severity(), self.message(), self.code())?;
        if let Some(detail) = self.detail() {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = self.hint() {
            write!(f, "\nHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Errors produced by the protocol core.
#[derive(Debug, Error)]
pub enum Error {
    /// Server returned an ErrorResponse (failed command or fatal startup error).
    #[error("server error: {0}")]
    PgError(ErrorDict),

    /// Authentication method mismatch, rejected credentials, or a malformed challenge.
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// The server asked for a behavior this engine deliberately does not implement
    /// (SCRAM/SASL/Kerberos/GSS authentication, an unsupported startup negotiation reply).
    #[error("unsupported: {0}")]
    UnsupportedError(String),

    /// The caller asked for something the connection state forbids: a second
    /// in-flight request, a copy operation issued outside copy mode, a call
    /// on a connection that already finished.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed message framing or an invariant violation while parsing bytes
    /// already known to be on the wire.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The byte transport itself failed (read/write/shutdown).
    #[error("transport error: {0}")]
    TransportError(#[from] std::io::Error),

    /// A cancel request's own transport did not observe the server closing
    /// the connection within the caller-supplied deadline.
    #[error("cancel request timed out")]
    TimeoutError,

    /// The connection actor task is gone; its `Handle` can no longer be used.
    #[error("connection closed")]
    ConnectionClosed,
}

impl Error {
    /// True when the connection this error came from can no longer be reused.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Error::TransportError(_) | Error::ConnectionClosed => true,
            Error::PgError(dict) => matches!(dict.severity_v(), "FATAL" | "PANIC"),
            _ => false,
        }
    }

    /// SQLSTATE code, if this originated from a server ErrorResponse.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::PgError(dict) => Some(dict.code()),
            _ => None,
        }
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized> From<zerocopy::error::CastError<Src, Dst>>
    for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}
