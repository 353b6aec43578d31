//! Request pacing and retry logic shared by every outbound call.
//!
//! One [`RateLimiter`] is constructed per run and threaded through the
//! client, so API calls and page scrapes share the same minimum spacing.
//! [`with_retry`] drives a single operation through an explicit
//! attempt / backoff state machine.

use std::fmt::Display;
use std::future::Future;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::{IntoLeaderboardError, LeaderboardError};

/// Default spacing between consecutive requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(400);

/// Enforces a minimum interval between consecutive requests.
///
/// Tracks the time of the last request; `acquire()` sleeps until the
/// interval since then has elapsed and records the new request time.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
    tracker: RequestTracker,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
            tracker: RequestTracker::default(),
        }
    }

    /// Wait until the minimum interval since the previous request has passed.
    /// The first request never waits.
    pub async fn acquire(&self) {
        let wait = {
            let last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            last.and_then(|t| (t + self.min_interval).checked_duration_since(Instant::now()))
        };
        if let Some(dur) = wait.filter(|d| !d.is_zero()) {
            sleep(dur).await;
        }
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    /// Access the request tracker for recording outcomes.
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

/// The remote resources a run touches, for per-endpoint accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    ContestList,
    ContestStandings,
    ContestStatus,
    UserStatus,
    MemberPage,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContestList => "contest.list",
            Self::ContestStandings => "contest.standings",
            Self::ContestStatus => "contest.status",
            Self::UserStatus => "user.status",
            Self::MemberPage => "members page",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempt outcomes for one endpoint. `fetched` counts responses that were
/// actually used, so for paged endpoints it is the number of pages read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointCounts {
    pub fetched: u64,
    pub retried: u64,
    pub failed: u64,
}

impl EndpointCounts {
    pub fn attempts(&self) -> u64 {
        self.fetched + self.retried + self.failed
    }
}

/// Per-endpoint request accounting plus total time spent backing off.
#[derive(Default)]
pub struct RequestTracker {
    counts: Mutex<BTreeMap<Endpoint, EndpointCounts>>,
    total_backoff_ms: AtomicU64,
}

impl RequestTracker {
    fn update(&self, endpoint: Endpoint, apply: impl FnOnce(&mut EndpointCounts)) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        apply(counts.entry(endpoint).or_default());
    }

    pub fn record_fetched(&self, endpoint: Endpoint) {
        self.update(endpoint, |c| c.fetched += 1);
    }

    pub fn record_retryable(&self, endpoint: Endpoint) {
        self.update(endpoint, |c| c.retried += 1);
    }

    pub fn record_failure(&self, endpoint: Endpoint) {
        self.update(endpoint, |c| c.failed += 1);
    }

    pub fn record_backoff(&self, duration: Duration) {
        self.total_backoff_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn summary(&self) -> TrackerSummary {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        TrackerSummary {
            by_endpoint: counts.iter().map(|(e, c)| (*e, *c)).collect(),
            total_backoff_secs: self.total_backoff_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Counters at one point in time, ordered by endpoint.
#[derive(Debug, Clone, Default)]
pub struct TrackerSummary {
    pub by_endpoint: Vec<(Endpoint, EndpointCounts)>,
    pub total_backoff_secs: f64,
}

impl TrackerSummary {
    /// Zero counts for an endpoint that was never called.
    pub fn get(&self, endpoint: Endpoint) -> EndpointCounts {
        self.by_endpoint
            .iter()
            .find(|(e, _)| *e == endpoint)
            .map(|(_, c)| *c)
            .unwrap_or_default()
    }

    pub fn totals(&self) -> EndpointCounts {
        self.by_endpoint
            .iter()
            .fold(EndpointCounts::default(), |acc, (_, c)| EndpointCounts {
                fetched: acc.fetched + c.fetched,
                retried: acc.retried + c.retried,
                failed: acc.failed + c.failed,
            })
    }
}

/// Bounded exponential backoff: `base * 2^attempt` after the attempt-th failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay after the failure of the zero-based `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.min(16);
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}

/// Classifies per-attempt errors as worth retrying or terminal.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for codeforces_api::Error {
    fn is_retryable(&self) -> bool {
        codeforces_api::Error::is_retryable(self)
    }
}

/// Why [`with_retry`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// A non-retryable error, surfaced on the attempt that produced it.
    Fatal(E),
    /// Every attempt failed with a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E>
where
    E: IntoLeaderboardError + Display,
{
    pub fn into_error(self, label: &str) -> LeaderboardError {
        match self {
            Self::Fatal(err) => err.into_leaderboard_error(label),
            Self::Exhausted { attempts, last } => LeaderboardError::RetriesExhausted {
                label: label.to_string(),
                attempts,
                last: last.to_string(),
            },
        }
    }
}

enum RetryState<T, E> {
    Attempting { attempt: u32 },
    Backoff { next_attempt: u32, delay: Duration },
    Success(T),
    Exhausted { attempts: u32, last: E },
}

/// Execute an async operation with pacing and exponential backoff.
///
/// - Calls `rate_limiter.acquire()` before each attempt.
/// - On a retryable error: waits `policy.delay_for_attempt(attempt)` and
///   tries again, up to `policy.max_attempts` attempts in total. No wait
///   follows the final attempt.
/// - On any other error: returns [`RetryError::Fatal`] immediately.
/// - Records every outcome on the tracker under `endpoint`.
pub async fn with_retry<F, Fut, T, E>(
    rate_limiter: &RateLimiter,
    policy: &RetryPolicy,
    endpoint: Endpoint,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let tracker = rate_limiter.tracker();
    let mut state = RetryState::Attempting { attempt: 0 };

    loop {
        state = match state {
            RetryState::Attempting { attempt } => {
                rate_limiter.acquire().await;
                match operation().await {
                    Ok(value) => {
                        tracker.record_fetched(endpoint);
                        RetryState::Success(value)
                    }
                    Err(err) if err.is_retryable() => {
                        tracker.record_retryable(endpoint);
                        let attempts = attempt + 1;
                        if attempts >= policy.max_attempts {
                            RetryState::Exhausted {
                                attempts,
                                last: err,
                            }
                        } else {
                            let delay = policy.delay_for_attempt(attempt);
                            tracing::warn!(
                                "{} failed (attempt {}/{}), retrying in {:.1}s: {}",
                                label,
                                attempts,
                                policy.max_attempts,
                                delay.as_secs_f64(),
                                err
                            );
                            RetryState::Backoff {
                                next_attempt: attempts,
                                delay,
                            }
                        }
                    }
                    Err(err) => {
                        tracker.record_failure(endpoint);
                        return Err(RetryError::Fatal(err));
                    }
                }
            }
            RetryState::Backoff {
                next_attempt,
                delay,
            } => {
                tracker.record_backoff(delay);
                sleep(delay).await;
                RetryState::Attempting {
                    attempt: next_attempt,
                }
            }
            RetryState::Success(value) => return Ok(value),
            RetryState::Exhausted { attempts, last } => {
                return Err(RetryError::Exhausted { attempts, last })
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Broken,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    #[tokio::test]
    async fn first_acquire_does_not_wait() {
        tokio::time::pause();
        let limiter = RateLimiter::new(Duration::from_millis(400));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn consecutive_acquires_are_spaced() {
        tokio::time::pause();
        let limiter = RateLimiter::new(Duration::from_millis(400));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test]
    async fn idle_time_counts_toward_interval() {
        tokio::time::pause();
        let limiter = RateLimiter::new(Duration::from_millis(400));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(1000)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn policy_needs_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn with_retry_succeeds_first_attempt() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let result = with_retry(
            &limiter,
            &RetryPolicy::default(),
            Endpoint::ContestList,
            "op",
            || async { Ok::<_, TestError>(42) },
        )
        .await;
        assert_eq!(result.unwrap(), 42);

        let counts = limiter.tracker().summary().get(Endpoint::ContestList);
        assert_eq!(counts.attempts(), 1);
        assert_eq!(counts.fetched, 1);
    }

    #[tokio::test]
    async fn with_retry_retries_transient_errors() {
        tokio::time::pause();

        let limiter = RateLimiter::new(Duration::ZERO);
        let attempt = Arc::new(AtomicU64::new(0));
        let attempt_clone = Arc::clone(&attempt);

        let result = with_retry(
            &limiter,
            &RetryPolicy::new(5, Duration::from_millis(100)),
            Endpoint::UserStatus,
            "op",
            move || {
                let attempt = Arc::clone(&attempt_clone);
                async move {
                    let n = attempt.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok(99)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 99);
        let summary = limiter.tracker().summary();
        let counts = summary.get(Endpoint::UserStatus);
        assert_eq!(counts.fetched, 1);
        assert_eq!(counts.retried, 2);
        assert_eq!(summary.get(Endpoint::ContestList), EndpointCounts::default());
        // 100ms + 200ms
        assert!((summary.total_backoff_secs - 0.3).abs() < 0.001);
    }

    #[tokio::test]
    async fn with_retry_stops_on_terminal_error() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let calls = Arc::new(AtomicU64::new(0));
        let calls_clone = Arc::clone(&calls);
        let result = with_retry(
            &limiter,
            &RetryPolicy::default(),
            Endpoint::MemberPage,
            "op",
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(TestError::Broken) }
            },
        )
        .await;

        assert!(matches!(result, Err(RetryError::Fatal(TestError::Broken))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            limiter.tracker().summary().get(Endpoint::MemberPage).failed,
            1
        );
    }

    #[tokio::test]
    async fn with_retry_exhausts_attempts() {
        tokio::time::pause();

        let limiter = RateLimiter::new(Duration::ZERO);
        let result = with_retry(
            &limiter,
            &RetryPolicy::new(5, Duration::from_millis(500)),
            Endpoint::ContestStatus,
            "op",
            || async { Err::<i32, _>(TestError::Transient) },
        )
        .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(last, TestError::Transient));
            }
            _ => panic!("expected exhaustion"),
        }
        let summary = limiter.tracker().summary();
        assert_eq!(summary.get(Endpoint::ContestStatus).retried, 5);
        // 0.5 + 1 + 2 + 4, nothing after the last attempt
        assert!((summary.total_backoff_secs - 7.5).abs() < 0.001);
    }

    #[tokio::test]
    async fn summary_groups_by_endpoint_and_totals() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let tracker = limiter.tracker();
        tracker.record_fetched(Endpoint::UserStatus);
        tracker.record_fetched(Endpoint::UserStatus);
        tracker.record_retryable(Endpoint::MemberPage);
        tracker.record_fetched(Endpoint::ContestList);

        let summary = tracker.summary();
        let order: Vec<Endpoint> = summary.by_endpoint.iter().map(|(e, _)| *e).collect();
        assert_eq!(
            order,
            vec![Endpoint::ContestList, Endpoint::UserStatus, Endpoint::MemberPage]
        );
        assert_eq!(summary.get(Endpoint::UserStatus).fetched, 2);
        let totals = summary.totals();
        assert_eq!(totals.fetched, 3);
        assert_eq!(totals.retried, 1);
        assert_eq!(totals.attempts(), 4);
    }
}
