//! Bounded retry and timeouts for store calls.
//!
//! `StorageUnavailable` is the only transient error: it is retried with
//! exponential backoff up to `max_attempts`. Version conflicts are retried by
//! the read-modify-write loop in the preference service instead, since they
//! need a fresh read first.

use std::future::Future;
use std::time::Duration;

use pronouns_types::config::RetryConfig;
use pronouns_types::error::StoreError;

/// Exponential backoff policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based: the delay after the
    /// first failure is `delay_for(1)`). Doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` attempts failed.
    pub fn should_retry(&self, attempt: u32, error: &StoreError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

/// Run `op` until it succeeds, fails non-transiently, or attempts run out.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    op_name: &'static str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if policy.should_retry(attempt, &err) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    op = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient storage failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Bound a store call by `timeout`, mapping expiry to `StorageUnavailable`.
pub async fn with_timeout<T, Fut>(
    timeout: Duration,
    op_name: &'static str,
    fut: Fut,
) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::StorageUnavailable(format!(
            "{op_name} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(4, Duration::from_millis(50), Duration::from_millis(300))
    }

    #[test]
    fn delay_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_millis(50));
        assert_eq!(p.delay_for(2), Duration::from_millis(100));
        assert_eq!(p.delay_for(3), Duration::from_millis(200));
        assert_eq!(p.delay_for(4), Duration::from_millis(300));
        assert_eq!(p.delay_for(40), Duration::from_millis(300));
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let p = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(p.max_attempts, 1);
        assert!(!p.should_retry(1, &StoreError::StorageUnavailable("x".into())));
    }

    #[test]
    fn only_transient_errors_retry() {
        let p = policy();
        assert!(p.should_retry(1, &StoreError::StorageUnavailable("x".into())));
        assert!(!p.should_retry(4, &StoreError::StorageUnavailable("x".into())));
        assert!(!p.should_retry(1, &StoreError::StorageCorrupt("x".into())));
        assert!(!p.should_retry(1, &StoreError::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_transient_recovers() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&policy(), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(StoreError::StorageUnavailable("busy".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_transient_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&policy(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::StorageUnavailable("down".into()))
        })
        .await;
        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(&policy(), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::StorageCorrupt("bad row".into()))
        })
        .await;
        assert!(matches!(result, Err(StoreError::StorageCorrupt(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_unavailable() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        match result {
            Err(StoreError::StorageUnavailable(msg)) => assert!(msg.contains("slow timed out")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
