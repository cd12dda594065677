//! Bounded retry with exponential backoff, and a race-based timeout.
//!
//! Every upstream call in the API goes through [`call_upstream`], which
//! wraps the operation in [`retry_with_backoff`] and then races the whole
//! retry loop against a deadline with [`with_timeout`].

use std::future::Future;
use std::time::Duration;

use crate::shopify::UpstreamError;

/// Default retry budget: 3 retries, 4 attempts total.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff sleep; doubles on each subsequent retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Deadline for one logical upstream call, retries included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry `op` with pure exponential backoff (no jitter).
///
/// Total attempts = `max_retries + 1`. A non-retryable error, or an error on
/// the final attempt, is returned immediately without a further sleep;
/// otherwise the loop sleeps `base_delay * 2^attempt` and tries again.
pub async fn retry_with_backoff<T, F, Fut>(
    mut op: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.retryable || attempt >= max_retries {
                    return Err(err);
                }

                let delay = base_delay * 2u32.saturating_pow(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retrying upstream call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Race `fut` against a deadline.
///
/// The operation runs as a spawned task: when the timer fires first the call
/// fails with a timeout error, but the task itself keeps running to
/// completion and its result is discarded. That fire-and-forget leak is
/// accepted at this system's scale; propagating cancellation into upstream
/// HTTP calls is not worth the coordination.
pub async fn with_timeout<T>(
    fut: impl Future<Output = Result<T, UpstreamError>> + Send + 'static,
    timeout: Duration,
) -> Result<T, UpstreamError>
where
    T: Send + 'static,
{
    let task = tokio::spawn(fut);

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(UpstreamError::other(format!(
            "upstream task failed: {join_err}"
        ))),
        Err(_elapsed) => Err(UpstreamError::timed_out(timeout)),
    }
}

/// Standard wrapping for one logical upstream call: bounded backoff inside a
/// 10-second deadline.
pub async fn call_upstream<T, F, Fut>(op: F) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, UpstreamError>> + Send + 'static,
    T: Send + 'static,
{
    with_timeout(
        retry_with_backoff(op, DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY),
        DEFAULT_TIMEOUT,
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Millisecond delays keep the backoff tests fast.
    const TEST_DELAY: Duration = Duration::from_millis(1);

    fn flaky(
        failures: u32,
        status: u16,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<&'static str, UpstreamError>> + Send>>
    {
        move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(UpstreamError::from_status(status, "induced"))
                } else {
                    Ok("success")
                }
            })
        }
    }

    #[tokio::test]
    async fn retries_429_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_with_backoff(flaky(2, 429, Arc::clone(&calls)), 3, TEST_DELAY).await;

        assert_eq!(result.expect("third attempt succeeds"), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_client_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_with_backoff(flaky(5, 400, Arc::clone(&calls)), 3, TEST_DELAY).await;

        let err = result.expect_err("400 fails immediately");
        assert_eq!(err.status, Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_the_retry_budget_and_returns_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_with_backoff(flaky(10, 503, Arc::clone(&calls)), 3, TEST_DELAY).await;

        let err = result.expect_err("budget exhausted");
        assert_eq!(err.status, Some(503));
        // max_retries = 3 means 4 attempts in total
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = retry_with_backoff(flaky(1, 503, Arc::clone(&calls)), 0, TEST_DELAY).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_fires_before_a_slow_operation() {
        let result: Result<(), _> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
            Duration::from_millis(20),
        )
        .await;

        let err = result.expect_err("timer wins");
        assert!(err.retryable);
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn timeout_passes_through_a_fast_operation() {
        let result = with_timeout(async { Ok(42) }, Duration::from_secs(1)).await;
        assert_eq!(result.expect("fast op"), 42);
    }
}
