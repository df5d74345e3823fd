//! Failure inspection surface and the executor's error type.

use std::fmt;
use std::io;

/// What the classifier can see of a failed call.
///
/// Ledger client errors surface in three shapes: a socket-level system code
/// (`ECONNRESET`), an HTTP status from the node gateway, or only a message.
/// Implementors expose whichever of these they carry.
pub trait FailureDetails {
    /// Human-readable message, including any wrapped causes.
    fn message(&self) -> String;

    /// HTTP status code, if the failure came from an HTTP response.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// System-level network error code such as `ECONNREFUSED`.
    fn system_code(&self) -> Option<&str> {
        None
    }
}

/// Concrete failure for call sites that build errors by hand (e.g. from a
/// gateway response body or a subprocess exit).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFailure {
    pub system_code: Option<String>,
    pub status_code: Option<u16>,
    pub message: String,
}

impl CallFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_system_code(mut self, code: impl Into<String>) -> Self {
        self.system_code = Some(code.into());
        self
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.system_code, self.status_code) {
            (Some(code), _) => write!(f, "{}: {}", code, self.message),
            (None, Some(status)) => write!(f, "HTTP {}: {}", status, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CallFailure {}

impl FailureDetails for CallFailure {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    fn system_code(&self) -> Option<&str> {
        self.system_code.as_deref()
    }
}

/// Map an io error kind to the errno-style name the classifier matches on.
fn io_system_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::NetworkUnreachable => Some("ENETUNREACH"),
        io::ErrorKind::HostUnreachable => Some("EHOSTUNREACH"),
        io::ErrorKind::NotFound => Some("ENOENT"),
        io::ErrorKind::PermissionDenied => Some("EACCES"),
        _ => None,
    }
}

impl FailureDetails for io::Error {
    fn message(&self) -> String {
        self.to_string()
    }

    fn system_code(&self) -> Option<&str> {
        io_system_code(self.kind())
    }
}

impl FailureDetails for anyhow::Error {
    fn message(&self) -> String {
        format!("{:#}", self)
    }

    fn status_code(&self) -> Option<u16> {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<CallFailure>())
            .and_then(|failure| failure.status_code)
    }

    fn system_code(&self) -> Option<&str> {
        self.chain().find_map(|cause| {
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                return io_system_code(io_err.kind());
            }
            cause
                .downcast_ref::<CallFailure>()
                .and_then(|failure| failure.system_code.as_deref())
        })
    }
}

/// Error returned by the retry executor.
///
/// `Failed` carries the operation's own error exactly as it was returned by
/// the last attempt. `Aborted` is only produced when the abort token fires.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("{0}")]
    Failed(E),
    #[error("{operation} aborted after {attempts} attempt(s)")]
    Aborted { operation: String, attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RetryError::Aborted { .. })
    }

    /// The operation's original error, or `None` if the loop was aborted.
    pub fn into_failure(self) -> Option<E> {
        match self {
            RetryError::Failed(e) => Some(e),
            RetryError::Aborted { .. } => None,
        }
    }
}
