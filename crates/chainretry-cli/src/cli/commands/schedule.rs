//! `chainretry schedule` – print the delays a classification would use.

use chainretry_core::retry::{ErrorClassification, RetryExecutor, RetryPolicy};

pub(crate) fn schedule_lines(policy: &RetryPolicy) -> Vec<String> {
    let mut total_ms = 0u128;
    (0..policy.max_attempts)
        .filter(|_| policy.should_retry)
        .map(|attempt| {
            let delay_ms = policy.delay(attempt).as_millis();
            total_ms += delay_ms;
            format!(
                "retry {}: wait {}ms (total {}ms)",
                attempt + 1,
                delay_ms,
                total_ms
            )
        })
        .collect()
}

pub fn run_schedule(executor: &RetryExecutor, classification: ErrorClassification) {
    let policy = executor.policies().policy_for(classification);
    let lines = schedule_lines(&policy);
    if lines.is_empty() {
        println!("{} failures are not retried", classification);
        return;
    }
    for line in lines {
        println!("{}", line);
    }
}
