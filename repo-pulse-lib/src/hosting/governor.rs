//! Rate and retry governance for hosting API requests.
//!
//! Every request made by the adapter goes through [`Governor::call`]. The governor
//! owns the process-wide view of the API quota and decides, per attempt, whether to
//! proceed, wait for the quota to reset, back off and retry, or give up.

use super::HostingError;
use super::client::{ApiResult, Failure, RateLimitInfo};
use chrono::{DateTime, Utc};
use core::time::Duration;
use rand::Rng;
use std::sync::Mutex;

const LOG_TARGET: &str = "  governor";

/// Retry and wait budget applied to each governed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Longest wait for a quota reset before failing with [`HostingError::RateLimited`]
    pub max_rate_limit_wait: Duration,
    /// Spread each backoff delay by up to 25% in either direction
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_rate_limit_wait: Duration::from_secs(60),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1_u32 << exponent);
        delay.min(self.max_delay)
    }

    fn retry_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = retry_after.unwrap_or_else(|| self.backoff_delay(attempt));
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.75..=1.25))
        } else {
            delay
        }
    }
}

/// Last known API quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// `None` until the first response carrying rate limit headers
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Shared rate-limit and retry policy for all hosting requests.
#[derive(Debug, Default)]
pub struct Governor {
    policy: RetryPolicy,
    state: Mutex<RateLimitState>,
}

impl Governor {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(RateLimitState::default()),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Snapshot of the current quota state.
    #[must_use]
    pub fn rate_limit_state(&self) -> RateLimitState {
        *self.state.lock().expect("lock not poisoned")
    }

    /// Run `request` under the retry policy.
    ///
    /// `request` is invoked once per attempt and must issue a fresh request each time.
    /// `context` describes the operation for logs and errors.
    pub async fn call<T, F, Fut>(&self, context: &str, mut request: F) -> Result<T, HostingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.reserve(context).await?;

            log::debug!(target: LOG_TARGET, "{context}: attempt {attempt} in flight");

            match request().await {
                ApiResult::Success(value, rate_limit) => {
                    self.observe(rate_limit);
                    log::debug!(target: LOG_TARGET, "{context}: attempt {attempt} succeeded");
                    return Ok(value);
                }

                ApiResult::RateLimited(rate_limit) => {
                    self.observe(Some(RateLimitInfo { remaining: 0, ..rate_limit }));

                    if attempt >= self.policy.max_attempts {
                        log::debug!(target: LOG_TARGET, "{context}: rate limited on final attempt {attempt}");
                        return Err(HostingError::RateLimited {
                            context: context.to_string(),
                            reset_at: rate_limit.reset_at,
                        });
                    }

                    log::debug!(
                        target: LOG_TARGET,
                        "{context}: rate limited until {}, retry scheduled after reset",
                        rate_limit.reset_at
                    );
                }

                ApiResult::Failed(failure, rate_limit) => {
                    self.observe(rate_limit);

                    if !failure.is_transient() || attempt >= self.policy.max_attempts {
                        log::debug!(target: LOG_TARGET, "{context}: attempt {attempt} failed: {failure:?}");
                        return Err(into_hosting_error(failure, context));
                    }

                    let retry_after = match failure {
                        Failure::SecondaryRateLimit { retry_after, .. } => retry_after,
                        _ => None,
                    };
                    let delay = self.policy.retry_delay(attempt, retry_after);

                    log::debug!(
                        target: LOG_TARGET,
                        "{context}: attempt {attempt} failed ({failure:?}), retry scheduled in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Claim one request from the known quota, waiting for a reset if it is exhausted.
    async fn reserve(&self, context: &str) -> Result<(), HostingError> {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("lock not poisoned");
                let now = Utc::now();

                match *state {
                    RateLimitState {
                        reset_at: Some(reset_at), ..
                    } if reset_at <= now => {
                        *state = RateLimitState::default();
                        return Ok(());
                    }

                    RateLimitState {
                        remaining: Some(0),
                        reset_at: Some(reset_at),
                    } => {
                        let wait = (reset_at - now).to_std().unwrap_or_default();
                        if wait > self.policy.max_rate_limit_wait {
                            log::debug!(
                                target: LOG_TARGET,
                                "{context}: quota resets in {}s, beyond the {}s wait budget",
                                wait.as_secs(),
                                self.policy.max_rate_limit_wait.as_secs()
                            );
                            return Err(HostingError::RateLimited {
                                context: context.to_string(),
                                reset_at,
                            });
                        }
                        wait
                    }

                    RateLimitState { remaining: Some(n), .. } => {
                        state.remaining = Some(n.saturating_sub(1));
                        return Ok(());
                    }

                    RateLimitState { remaining: None, .. } => return Ok(()),
                }
            };

            log::info!(target: LOG_TARGET, "API quota exhausted, waiting {}s for it to reset", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    /// Fold rate limit headers from a response into the shared state.
    fn observe(&self, info: Option<RateLimitInfo>) {
        let Some(info) = info else {
            return;
        };

        let mut state = self.state.lock().expect("lock not poisoned");
        match state.reset_at {
            // Responses to concurrent requests may arrive out of order; keep the lowest count
            Some(reset_at) if reset_at == info.reset_at => {
                state.remaining = Some(state.remaining.map_or(info.remaining, |r| r.min(info.remaining)));
            }

            // Stale quota window
            Some(reset_at) if reset_at > info.reset_at => {}

            _ => {
                *state = RateLimitState {
                    remaining: Some(info.remaining),
                    reset_at: Some(info.reset_at),
                };
            }
        }
    }
}

fn into_hosting_error(failure: Failure, context: &str) -> HostingError {
    let context = context.to_string();
    match failure {
        Failure::Network(message) => HostingError::Transport { context, message },
        Failure::NotFound => HostingError::NotFound { context },
        Failure::Auth { status } => HostingError::Auth { context, status },
        Failure::Server { status } | Failure::SecondaryRateLimit { status, .. } | Failure::Client { status } => {
            HostingError::Upstream { context, status }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_rate_limit_wait: Duration::from_secs(5),
            jitter: false,
        }
    }

    fn quota(remaining: u64, reset_in_secs: i64) -> RateLimitInfo {
        RateLimitInfo {
            remaining,
            reset_at: Utc::now() + chrono::Duration::seconds(reset_in_secs),
        }
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            ..RetryPolicy::default()
        };

        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(800));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_delay(1, Some(Duration::from_secs(7))), Duration::from_secs(7));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
            jitter: true,
            ..RetryPolicy::default()
        };

        for _ in 0..100 {
            let delay = policy.retry_delay(1, None);
            assert!(delay >= Duration::from_millis(750));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[tokio::test]
    async fn test_success_records_quota() {
        let governor = Governor::new(fast_policy());
        let info = quota(4999, 3600);

        let value = governor.call("test", || async { ApiResult::Success(42, Some(info)) }).await.unwrap();

        assert_eq!(value, 42);
        assert_eq!(
            governor.rate_limit_state(),
            RateLimitState {
                remaining: Some(4999),
                reset_at: Some(info.reset_at)
            }
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let governor = Governor::new(fast_policy());
        let calls = AtomicU32::new(0);

        let value = governor
            .call("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        ApiResult::Failed(Failure::Server { status: 502 }, None)
                    } else {
                        ApiResult::Success("ok", None)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let governor = Governor::new(fast_policy());
        let calls = AtomicU32::new(0);

        let err = governor
            .call("fetching commits for 'octo/demo'", || {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async { ApiResult::<()>::Failed(Failure::Network("connection reset".into()), None) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, HostingError::Transport { ref context, .. } if context.contains("octo/demo")));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let governor = Governor::new(fast_policy());
        let calls = AtomicU32::new(0);

        let err = governor
            .call("test", || {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async { ApiResult::<()>::Failed(Failure::Client { status: 422 }, None) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn test_not_found_and_auth_are_not_retried() {
        let governor = Governor::new(fast_policy());

        let err = governor
            .call("test", || async { ApiResult::<()>::Failed(Failure::NotFound, None) })
            .await
            .unwrap_err();
        assert!(matches!(err, HostingError::NotFound { .. }));

        let err = governor
            .call("test", || async { ApiResult::<()>::Failed(Failure::Auth { status: 401 }, None) })
            .await
            .unwrap_err();
        assert!(matches!(err, HostingError::Auth { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_quota_beyond_budget_fails_fast() {
        let governor = Governor::new(fast_policy());
        governor.observe(Some(quota(0, 3600)));

        let calls = AtomicU32::new(0);
        let err = governor
            .call("test", || {
                let _ = calls.fetch_add(1, Ordering::SeqCst);
                async { ApiResult::Success((), None) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(err.reset_at().is_some());
    }

    #[tokio::test]
    async fn test_rate_limited_then_success_waits_for_reset() {
        let governor = Governor::new(fast_policy());
        let calls = AtomicU32::new(0);
        let limited = quota(0, 1);

        let start = std::time::Instant::now();
        let value = governor
            .call("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        ApiResult::RateLimited(limited)
                    } else {
                        ApiResult::Success(7, Some(quota(4999, 3600)))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_reserve_decrements_known_quota() {
        let governor = Governor::new(fast_policy());
        governor.observe(Some(quota(10, 3600)));

        governor.reserve("test").await.unwrap();
        governor.reserve("test").await.unwrap();

        assert_eq!(governor.rate_limit_state().remaining, Some(8));
    }

    #[tokio::test]
    async fn test_past_reset_clears_state() {
        let governor = Governor::new(fast_policy());
        governor.observe(Some(quota(0, -10)));

        governor.reserve("test").await.unwrap();

        assert_eq!(governor.rate_limit_state(), RateLimitState::default());
    }

    #[test]
    fn test_observe_keeps_lowest_remaining_for_same_window() {
        let governor = Governor::new(fast_policy());
        let low = quota(100, 3600);
        let high = RateLimitInfo { remaining: 200, ..low };

        governor.observe(Some(low));
        governor.observe(Some(high));
        assert_eq!(governor.rate_limit_state().remaining, Some(100));
    }

    #[test]
    fn test_observe_ignores_stale_window() {
        let governor = Governor::new(fast_policy());
        let current = quota(100, 3600);
        let stale = quota(5, 60);

        governor.observe(Some(current));
        governor.observe(Some(stale));
        assert_eq!(governor.rate_limit_state().reset_at, Some(current.reset_at));

        let next = quota(5000, 7200);
        governor.observe(Some(next));
        assert_eq!(governor.rate_limit_state().remaining, Some(5000));
    }

    #[test]
    fn test_secondary_rate_limit_maps_to_upstream() {
        let err = into_hosting_error(
            Failure::SecondaryRateLimit {
                status: 403,
                retry_after: None,
            },
            "test",
        );
        assert_eq!(err.status(), Some(403));
    }
}
