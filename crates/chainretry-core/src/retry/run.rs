//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;

use super::classify::{Classifier, DefaultClassifier, ErrorClassification};
use super::error::{FailureDetails, RetryError};
use super::policy::{PolicyTable, RetryDecision};
use super::sleep::{Sleeper, TokioSleeper};
use crate::abort::AbortToken;
use crate::config::{ChainRetryConfig, ConfigError};

/// Classifies each failure, looks up its policy and backs off between
/// attempts. Holds no per-call state, so one executor can serve many
/// concurrent calls.
pub struct RetryExecutor<C = DefaultClassifier, S = TokioSleeper> {
    classifier: C,
    policies: PolicyTable,
    sleeper: S,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryExecutor {
    /// Default classifier, built-in policies, real timer.
    pub fn new() -> Self {
        Self {
            classifier: DefaultClassifier::new(),
            policies: PolicyTable::default(),
            sleeper: TokioSleeper,
        }
    }

    /// Executor with policy overrides and extra markers from config.
    pub fn from_config(cfg: &ChainRetryConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier: cfg.classifier(),
            policies: cfg.policy_table()?,
            sleeper: TokioSleeper,
        })
    }
}

impl<C, S> RetryExecutor<C, S>
where
    C: Classifier,
    S: Sleeper,
{
    pub fn with_classifier<C2: Classifier>(self, classifier: C2) -> RetryExecutor<C2, S> {
        RetryExecutor {
            classifier,
            policies: self.policies,
            sleeper: self.sleeper,
        }
    }

    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> RetryExecutor<C, S2> {
        RetryExecutor {
            classifier: self.classifier,
            policies: self.policies,
            sleeper,
        }
    }

    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn classify(&self, failure: &dyn FailureDetails) -> ErrorClassification {
        self.classifier.classify(failure)
    }

    /// Run `operation` until it succeeds, fails permanently, or exhausts
    /// the retry budget of its latest failure's classification.
    ///
    /// On failure the last error is returned unchanged in
    /// [`RetryError::Failed`].
    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: FailureDetails,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation_name, None, operation).await
    }

    /// Like [`execute_with_retry`](Self::execute_with_retry), but stops with
    /// [`RetryError::Aborted`] once `abort` is triggered. A trigger during a
    /// backoff delay cuts the delay short; an in-flight call is allowed to
    /// finish and its result is discarded only if it would be retried.
    pub async fn execute_with_abort<T, E, F, Fut>(
        &self,
        operation_name: &str,
        abort: &AbortToken,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: FailureDetails,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation_name, Some(abort), operation).await
    }

    async fn run<T, E, F, Fut>(
        &self,
        operation_name: &str,
        abort: Option<&AbortToken>,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: FailureDetails,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let aborted = |attempts: u32| {
            tracing::info!(operation = operation_name, attempts, "retry loop aborted");
            RetryError::Aborted {
                operation: operation_name.to_string(),
                attempts,
            }
        };

        // Shared by every classification: each failure is checked against
        // its own policy's max_attempts using this one counter.
        let mut attempt = 0u32;
        loop {
            if abort.is_some_and(AbortToken::is_triggered) {
                return Err(aborted(attempt));
            }

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let classification = self.classifier.classify(&error);
            let policy = self.policies.policy_for(classification);

            match policy.decide(attempt) {
                RetryDecision::NoRetry => {
                    tracing::warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        classification = %classification,
                        will_retry = false,
                        error = %error.message(),
                        "giving up"
                    );
                    return Err(RetryError::Failed(error));
                }
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        classification = %classification,
                        will_retry = true,
                        delay_ms = delay.as_millis() as u64,
                        error = %error.message(),
                        "attempt failed, retrying"
                    );
                    match abort {
                        Some(token) => {
                            tokio::select! {
                                biased;
                                _ = token.triggered() => return Err(aborted(attempt + 1)),
                                _ = self.sleeper.sleep(delay) => {}
                            }
                        }
                        None => self.sleeper.sleep(delay).await,
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Run `operation` with the default classifier, built-in policies and the
/// tokio timer.
pub async fn run_with_retry<T, E, F, Fut>(
    operation_name: &str,
    operation: F,
) -> Result<T, RetryError<E>>
where
    E: FailureDetails,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryExecutor::new()
        .execute_with_retry(operation_name, operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{CallFailure, RecordingSleeper, RetryPolicy};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn success_on_first_call_does_not_sleep() {
        let sleeper = RecordingSleeper::new();
        let executor = RetryExecutor::new().with_sleeper(sleeper.clone());
        let result = executor
            .execute_with_retry("anchor", || async { Ok::<_, CallFailure>(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn custom_classifier_is_used() {
        let sleeper = RecordingSleeper::new();
        let executor = RetryExecutor::new()
            .with_sleeper(sleeper.clone())
            .with_classifier(|_: &dyn FailureDetails| ErrorClassification::Permanent);
        let calls = AtomicU32::new(0);
        let result = executor
            .execute_with_retry("anchor", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(CallFailure::new("ECONNRESET")) }
            })
            .await;
        assert!(matches!(result, Err(RetryError::Failed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn custom_policies_are_used() {
        let sleeper = RecordingSleeper::new();
        let fast = RetryPolicy {
            should_retry: true,
            max_attempts: 1,
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_millis(10),
        };
        let executor = RetryExecutor::new()
            .with_sleeper(sleeper.clone())
            .with_policies(PolicyTable::new(fast, RetryPolicy::degraded()));
        let calls = AtomicU32::new(0);
        let result = executor
            .execute_with_retry("anchor", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(CallFailure::new("Network error")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.calls(), vec![Duration::from_millis(10)]);
    }

    #[tokio::test]
    async fn run_with_retry_permanent_fails_fast() {
        let start = std::time::Instant::now();
        let result = run_with_retry("register policy", || async {
            Err::<(), _>(anyhow::anyhow!("DuplicatePolicyVersion: v3 already exists"))
        })
        .await;
        let err = result.unwrap_err().into_failure().unwrap();
        assert!(err.to_string().contains("DuplicatePolicyVersion"));
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn classify_delegates_to_classifier() {
        let executor = RetryExecutor::new();
        assert_eq!(
            executor.classify(&CallFailure::new("gateway").with_status(502)),
            ErrorClassification::Degraded
        );
    }
}
