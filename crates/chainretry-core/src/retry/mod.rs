//! Classified retry with exponential backoff.
//!
//! Failures from outbound ledger calls are classified as retriable,
//! permanent, or degraded; each class maps to its own backoff policy so
//! callers (transaction submitters, proof anchoring) share one consistent
//! retry behaviour.

mod classify;
mod error;
mod policy;
mod run;
mod sleep;

pub use classify::{
    Classifier, DefaultClassifier, ErrorClassification, DEGRADED_MARKERS, PERMANENT_MARKERS,
    PERMANENT_SYSTEM_CODES, RETRIABLE_MARKERS, RETRIABLE_STATUS_TOKENS, RETRIABLE_SYSTEM_CODES,
};
pub use error::{CallFailure, FailureDetails, RetryError};
pub use policy::{PolicyTable, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryExecutor};
pub use sleep::{RecordingSleeper, Sleeper, TokioSleeper};
