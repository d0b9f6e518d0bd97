//! Exponential backoff with full jitter for retried backend/LLM/speech
//! calls.
//!
//! Follows the AWS "Full Jitter" strategy:
//! `delay = random(0, min(max_delay, base * 2^attempt))`.

use std::future::Future;
use std::time::Duration;

use careline_config::RetryProfile;
use tracing::warn;

/// Drives one operation through up to `profile.max_attempts` tries,
/// sleeping with full jitter backoff between attempts and stopping
/// immediately on a non-retryable error.
pub struct RetryHandler {
    profile: RetryProfile,
}

impl RetryHandler {
    #[must_use]
    pub fn new(profile: RetryProfile) -> Self {
        Self { profile }
    }

    /// Run `operation`, retrying while `is_retryable` returns true for the
    /// error and attempts remain. `operation_name` is only used for
    /// logging.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation_name: &str,
        is_retryable: impl Fn(&E) -> bool,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let retryable = is_retryable(&err);
                    let attempts_left = attempt + 1 < self.profile.max_attempts;
                    if !retryable || !attempts_left {
                        return Err(err);
                    }
                    let delay = self.next_delay(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        full_jitter_delay(self.profile.base_delay_ms, self.profile.max_delay_ms, attempt)
    }
}

/// `random(0, min(max_ms, base_ms * 2^attempt))`, saturating on overflow.
#[must_use]
pub fn full_jitter_delay(base_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let capped = exp.min(max_ms);
    let jittered = if capped == 0 { 0 } else { fastrand::u64(0..=capped) };
    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_never_exceeds_cap() {
        for attempt in 0..40 {
            let delay = full_jitter_delay(1_000, 10_000, attempt);
            assert!(delay <= Duration::from_millis(10_000));
        }
    }

    #[test]
    fn zero_base_is_zero_delay() {
        assert_eq!(full_jitter_delay(0, 0, 3), Duration::ZERO);
    }

    #[tokio::test]
    async fn retries_retryable_errors_up_to_max_attempts() {
        let handler = RetryHandler::new(RetryProfile {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        });
        let calls = AtomicU32::new(0);
        let result: Result<(), &'static str> = handler
            .execute(
                "test_op",
                |_e: &&str| true,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("boom") }
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let handler = RetryHandler::new(RetryProfile {
            max_attempts: 5,
            base_delay_ms: 1,
            max_delay_ms: 2,
        });
        let calls = AtomicU32::new(0);
        let result: Result<(), &'static str> = handler
            .execute(
                "test_op",
                |_e: &&str| false,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("non-retryable") }
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_without_exhausting_attempts() {
        let handler = RetryHandler::new(RetryProfile {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        });
        let calls = AtomicU32::new(0);
        let result = handler
            .execute(
                "test_op",
                |_e: &&str| true,
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move { if n == 1 { Ok::<_, &str>(42) } else { Err("not yet") } }
                },
            )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
