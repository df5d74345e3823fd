//! Classify ledger call failures into retry classes.

use super::error::FailureDetails;
use std::fmt;

/// High-level classification of a failure for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClassification {
    /// Transient infrastructure fault (connection, timeout, rate limit).
    Retriable,
    /// Caller or business-rule fault; retrying cannot change the outcome.
    Permanent,
    /// Downstream is up but unhealthy; retry slower and longer.
    Degraded,
}

impl ErrorClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClassification::Retriable => "retriable",
            ErrorClassification::Permanent => "permanent",
            ErrorClassification::Degraded => "degraded",
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retriable" | "retryable" => Ok(ErrorClassification::Retriable),
            "permanent" => Ok(ErrorClassification::Permanent),
            "degraded" => Ok(ErrorClassification::Degraded),
            other => Err(format!(
                "unknown classification '{}' (expected retriable, permanent or degraded)",
                other
            )),
        }
    }
}

/// System error codes for dropped or refused connections, timeouts,
/// unresolved hosts and unreachable networks.
pub const RETRIABLE_SYSTEM_CODES: &[&str] = &[
    "ECONNREFUSED",
    "ECONNRESET",
    "ECONNABORTED",
    "EPIPE",
    "ETIMEDOUT",
    "ENOTFOUND",
    "ENETUNREACH",
    "EHOSTUNREACH",
];

/// HTTP statuses that mean "overloaded, come back later" when they appear
/// in a message as a standalone number.
pub const RETRIABLE_STATUS_TOKENS: &[&str] = &["503", "429"];

/// Message fragments for overloaded or not-yet-ready nodes.
pub const RETRIABLE_MARKERS: &[&str] = &["Node not ready", "Network error"];

/// System error codes for a missing or inaccessible executable or file.
pub const PERMANENT_SYSTEM_CODES: &[&str] = &["ENOENT", "EACCES"];

/// Domain validation errors raised by the ledger contracts.
pub const PERMANENT_MARKERS: &[&str] = &[
    "ValidationError",
    "DuplicatePolicyVersion",
    "PolicyVersionNotFound",
    "InvalidData",
    "InvalidContentHash",
    "InvalidJurisdiction",
];

pub const DEGRADED_MARKERS: &[&str] = &["SnapshotStopped", "ConsensusFailure", "PartialFailure"];

const RETRIABLE_STATUS: &[u16] = &[429, 503];
const PERMANENT_STATUS: &[u16] = &[400, 401, 403, 404];
const DEGRADED_STATUS: &[u16] = &[502, 504];

/// True if `token` occurs in `message` with no letter, digit or underscore
/// directly before or after it. `tenant 15030` and `0x9f4290ab` do not
/// contain the token `503`/`429`; `HTTP 503` and `(429)` do.
fn contains_status_token(message: &str, token: &str) -> bool {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    message.match_indices(token).any(|(start, _)| {
        let before = message[..start].chars().next_back();
        let after = message[start + token.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Decides the retry class of a failure. Executors take one by value so
/// tests can substitute deterministic classifiers.
pub trait Classifier: Send + Sync {
    fn classify(&self, failure: &dyn FailureDetails) -> ErrorClassification;
}

impl<F> Classifier for F
where
    F: Fn(&dyn FailureDetails) -> ErrorClassification + Send + Sync,
{
    fn classify(&self, failure: &dyn FailureDetails) -> ErrorClassification {
        self(failure)
    }
}

/// Marker/status/system-code classifier used for ledger calls.
///
/// Checks run in order retriable, permanent, degraded; the first match
/// wins. Anything unmatched is treated as retriable.
#[derive(Debug, Clone, Default)]
pub struct DefaultClassifier {
    extra_permanent: Vec<String>,
    extra_degraded: Vec<String>,
}

impl DefaultClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add message markers on top of the built-in ones.
    pub fn with_extra_markers(
        mut self,
        permanent: impl IntoIterator<Item = String>,
        degraded: impl IntoIterator<Item = String>,
    ) -> Self {
        self.extra_permanent.extend(permanent);
        self.extra_degraded.extend(degraded);
        self
    }

    fn is_retriable(message: &str, status: Option<u16>, code: Option<&str>) -> bool {
        if code.is_some_and(|c| RETRIABLE_SYSTEM_CODES.contains(&c)) {
            return true;
        }
        if status.is_some_and(|s| RETRIABLE_STATUS.contains(&s)) {
            return true;
        }
        RETRIABLE_STATUS_TOKENS
            .iter()
            .any(|t| contains_status_token(message, t))
            || RETRIABLE_MARKERS.iter().any(|m| message.contains(m))
    }

    fn is_permanent(&self, message: &str, status: Option<u16>, code: Option<&str>) -> bool {
        if code.is_some_and(|c| PERMANENT_SYSTEM_CODES.contains(&c)) {
            return true;
        }
        if status.is_some_and(|s| PERMANENT_STATUS.contains(&s)) {
            return true;
        }
        PERMANENT_MARKERS.iter().any(|m| message.contains(m))
            || self.extra_permanent.iter().any(|m| message.contains(m.as_str()))
    }

    fn is_degraded(&self, message: &str, status: Option<u16>) -> bool {
        if status.is_some_and(|s| DEGRADED_STATUS.contains(&s)) {
            return true;
        }
        DEGRADED_MARKERS.iter().any(|m| message.contains(m))
            || self.extra_degraded.iter().any(|m| message.contains(m.as_str()))
    }
}

impl Classifier for DefaultClassifier {
    fn classify(&self, failure: &dyn FailureDetails) -> ErrorClassification {
        let message = failure.message();
        let status = failure.status_code();
        let code = failure.system_code();

        if Self::is_retriable(&message, status, code) {
            ErrorClassification::Retriable
        } else if self.is_permanent(&message, status, code) {
            ErrorClassification::Permanent
        } else if self.is_degraded(&message, status) {
            ErrorClassification::Degraded
        } else {
            ErrorClassification::Retriable
        }
    }
}
