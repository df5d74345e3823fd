//! `chainretry classify` – show how a failure would be handled.

use chainretry_core::retry::{CallFailure, RetryExecutor, RetryPolicy};

/// One-line summary of a policy, shared with `config`.
pub(crate) fn format_policy(policy: &RetryPolicy) -> String {
    if !policy.should_retry {
        return "no retry".to_string();
    }
    format!(
        "up to {} retries, initial {}ms, x{}, max {}ms",
        policy.max_attempts,
        policy.initial_delay.as_millis(),
        policy.backoff_multiplier,
        policy.max_delay.as_millis()
    )
}

pub(crate) fn build_failure(
    message: Option<String>,
    status: Option<u16>,
    code: Option<String>,
) -> CallFailure {
    let mut failure = CallFailure::new(message.unwrap_or_default());
    if let Some(status) = status {
        failure = failure.with_status(status);
    }
    if let Some(code) = code {
        failure = failure.with_system_code(code);
    }
    failure
}

pub fn run_classify(
    executor: &RetryExecutor,
    message: Option<String>,
    status: Option<u16>,
    code: Option<String>,
) {
    let failure = build_failure(message, status, code);
    let classification = executor.classify(&failure);
    let policy = executor.policies().policy_for(classification);
    println!("classification: {}", classification);
    println!("policy: {}", format_policy(&policy));
}
