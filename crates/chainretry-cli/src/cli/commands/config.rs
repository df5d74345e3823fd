//! `chainretry config` – show config location and effective policies.

use chainretry_core::retry::{ErrorClassification, RetryExecutor};
use std::path::Path;

use super::format_policy;

pub fn run_config(executor: &RetryExecutor, path: &Path) {
    println!("config: {}", path.display());
    for classification in [
        ErrorClassification::Retriable,
        ErrorClassification::Degraded,
        ErrorClassification::Permanent,
    ] {
        let policy = executor.policies().policy_for(classification);
        println!("{:<10} {}", classification.as_str(), format_policy(&policy));
    }
}
