use std::time::Duration;

use super::classify::ErrorClassification;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with a cap, one per classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub should_retry: bool,
    /// Number of retries allowed (not counting the first call).
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy for transient faults: 3 retries, 1s doubling, capped at 10s.
    pub const fn retriable() -> Self {
        Self {
            should_retry: true,
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
        }
    }

    /// Policy for an unhealthy downstream: 5 retries, 5s growing by 1.5x,
    /// capped at 30s.
    pub const fn degraded() -> Self {
        Self {
            should_retry: true,
            max_attempts: 5,
            initial_delay: Duration::from_millis(5000),
            backoff_multiplier: 1.5,
            max_delay: Duration::from_millis(30_000),
        }
    }

    pub const fn never() -> Self {
        Self {
            should_retry: false,
            max_attempts: 0,
            initial_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Built-in policy for a classification.
    pub const fn for_classification(classification: ErrorClassification) -> Self {
        match classification {
            ErrorClassification::Retriable => Self::retriable(),
            ErrorClassification::Degraded => Self::degraded(),
            ErrorClassification::Permanent => Self::never(),
        }
    }

    /// `min(initial_delay * multiplier^attempt, max_delay)`; `attempt` is
    /// zero-based (the first retry uses 0).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let raw_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exp);
        let cap_ms = self.max_delay.as_millis() as f64;
        // NaN (0 * inf) and overflow both collapse to the cap.
        let ms = if raw_ms.is_finite() { raw_ms.min(cap_ms) } else { cap_ms };
        Duration::from_millis(ms as u64)
    }

    /// Decide whether a failure on zero-based `attempt` gets another try.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if !self.should_retry || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.delay(attempt))
    }
}

/// The three policies an executor consults. Permanent failures are never
/// retried, so only the retriable and degraded entries are adjustable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyTable {
    retriable: RetryPolicy,
    degraded: RetryPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            retriable: RetryPolicy::retriable(),
            degraded: RetryPolicy::degraded(),
        }
    }
}

impl PolicyTable {
    pub fn new(retriable: RetryPolicy, degraded: RetryPolicy) -> Self {
        Self {
            retriable,
            degraded,
        }
    }

    pub fn policy_for(&self, classification: ErrorClassification) -> RetryPolicy {
        match classification {
            ErrorClassification::Retriable => self.retriable,
            ErrorClassification::Degraded => self.degraded,
            ErrorClassification::Permanent => RetryPolicy::never(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(d: Duration) -> u128 {
        d.as_millis()
    }

    #[test]
    fn builtin_table_values() {
        let r = RetryPolicy::for_classification(ErrorClassification::Retriable);
        assert!(r.should_retry);
        assert_eq!(r.max_attempts, 3);
        assert_eq!(ms(r.initial_delay), 1000);
        assert_eq!(r.backoff_multiplier, 2.0);
        assert_eq!(ms(r.max_delay), 10_000);

        let d = RetryPolicy::for_classification(ErrorClassification::Degraded);
        assert!(d.should_retry);
        assert_eq!(d.max_attempts, 5);
        assert_eq!(ms(d.initial_delay), 5000);
        assert_eq!(d.backoff_multiplier, 1.5);
        assert_eq!(ms(d.max_delay), 30_000);
    }

    #[test]
    fn permanent_never_retries() {
        let p = PolicyTable::default().policy_for(ErrorClassification::Permanent);
        assert!(!p.should_retry);
        assert_eq!(p.max_attempts, 0);
        assert_eq!(p.decide(0), RetryDecision::NoRetry);

        // Custom tables cannot make permanent failures retriable.
        let table = PolicyTable::new(RetryPolicy::degraded(), RetryPolicy::retriable());
        assert_eq!(table.policy_for(ErrorClassification::Permanent), RetryPolicy::never());
    }

    #[test]
    fn retriable_delays_double_then_cap() {
        let p = RetryPolicy::retriable();
        let delays: Vec<u128> = (0..6).map(|a| ms(p.delay(a))).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000, 10_000]);
    }

    #[test]
    fn degraded_delays_follow_formula() {
        let p = RetryPolicy::degraded();
        for n in 0..10u32 {
            let expected = (5000.0 * 1.5f64.powi(n as i32)).min(30_000.0) as u128;
            assert_eq!(ms(p.delay(n)), expected, "attempt {}", n);
        }
        assert_eq!(ms(p.delay(2)), 11_250);
    }

    #[test]
    fn delay_is_monotonic_and_capped() {
        for p in [RetryPolicy::retriable(), RetryPolicy::degraded()] {
            let mut prev = Duration::ZERO;
            for attempt in 0..64 {
                let d = p.delay(attempt);
                assert!(d >= prev);
                assert!(d <= p.max_delay);
                prev = d;
            }
            assert_eq!(p.delay(u32::MAX), p.max_delay);
        }
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy::retriable();
        assert_eq!(p.decide(0), RetryDecision::RetryAfter(Duration::from_secs(1)));
        assert_eq!(p.decide(2), RetryDecision::RetryAfter(Duration::from_secs(4)));
        assert_eq!(p.decide(3), RetryDecision::NoRetry);
    }
}
