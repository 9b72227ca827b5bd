//! Bounded retry for transient fetch failures.
//!
//! # Retry Strategy
//!
//! - Only [`FetchError::Retryable`] failures are attempted again
//! - Exponential backoff starting at `base_delay`, capped at 30 seconds
//! - Random jitter of up to a quarter of `base_delay` on top of each wait
//! - `max_retries == 0` means exactly one attempt per page

use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

use super::PageFetcher;
use crate::error::FetchError;

/// Wraps any [`PageFetcher`] and retries its transient failures.
///
/// The delay before retry `n` (1-based) is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..=base_delay/4)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_cap = u64::try_from(self.base_delay.as_millis() / 4).unwrap_or(u64::MAX);
        let jitter_ms: u64 = rng().random_range(0..=jitter_cap);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, page: u32) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(page).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                page,
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis(),
                                error = %e,
                                "fetch exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        page,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails with the queued errors first, then succeeds.
    struct Flaky {
        failures: Mutex<Vec<FetchError>>,
        calls: Mutex<u32>,
    }

    impl Flaky {
        fn new(mut failures: Vec<FetchError>) -> Self {
            failures.reverse();
            Flaky {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl PageFetcher for Flaky {
        async fn fetch(&self, page: u32) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            match self.failures.lock().unwrap().pop() {
                Some(e) => Err(e),
                None => Ok(format!("page {page}")),
            }
        }
    }

    fn transient() -> FetchError {
        FetchError::Retryable {
            url: "https://example.com/1".into(),
            reason: "connection reset".into(),
        }
    }

    fn fatal() -> FetchError {
        FetchError::Permanent {
            url: "https://example.com/1".into(),
            reason: "404 Not Found".into(),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let retry = RetryFetch::new(Flaky::new(vec![transient(), transient()]), 2, Duration::ZERO);
        assert_eq!(retry.fetch(1).await.unwrap(), "page 1");
        assert_eq!(retry.into_inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let retry = RetryFetch::new(
            Flaky::new(vec![transient(), transient(), transient()]),
            2,
            Duration::ZERO,
        );
        let err = retry.fetch(1).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(retry.into_inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let retry = RetryFetch::new(Flaky::new(vec![fatal()]), 5, Duration::ZERO);
        let err = retry.fetch(1).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(retry.into_inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let retry = RetryFetch::new(Flaky::new(vec![transient()]), 0, Duration::ZERO);
        assert!(retry.fetch(1).await.is_err());
        assert_eq!(retry.into_inner().calls(), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryFetch::new(Flaky::new(vec![]), 10, Duration::from_secs(1));
        let first = retry.backoff(1);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_millis(1250));
        let third = retry.backoff(3);
        assert!(third >= Duration::from_secs(4) && third <= Duration::from_millis(4250));
        let late = retry.backoff(9);
        assert!(late >= Duration::from_secs(30) && late <= Duration::from_millis(30_250));
    }
}
