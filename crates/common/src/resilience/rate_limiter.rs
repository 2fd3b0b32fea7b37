//! Fixed-window rate limiting keyed by caller
//!
//! Every key owns an independent window that opens on its first request.
//! Once `max_requests` requests have landed inside the window, further checks
//! are denied and report how long remains until the window resets. When the
//! window elapses the count starts over.
//!
//! State lives in memory only and is lost on restart. A background sweeper
//! can be started to drop expired windows; [`RateLimiter::shutdown`] stops it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};

/// Invalid limiter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_requests` was zero
    #[error("max_requests must be greater than 0")]
    ZeroMaxRequests,
    /// `window` was zero
    #[error("window must be greater than zero")]
    ZeroWindow,
}

/// Configuration for [`RateLimiter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Requests allowed per key inside one window
    pub max_requests: u32,
    /// Length of the window
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_requests: 60, window: Duration::from_secs(60) }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(())
    }
}

/// Builder for [`RateLimiterConfig`]
#[derive(Debug)]
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default() }
    }

    /// Requests allowed per window.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.config.max_requests = max_requests;
        self
    }

    /// Window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    /// Window length in milliseconds.
    pub fn window_ms(self, window_ms: u64) -> Self {
        self.window(Duration::from_millis(window_ms))
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<RateLimiterConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Outcome of [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Time until the key's window resets; zero when allowed
    pub retry_after: Duration,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self { allowed: true, retry_after: Duration::ZERO }
    }

    fn deny(retry_after: Duration) -> Self {
        Self { allowed: false, retry_after }
    }

    /// `retry_after` rounded up to whole milliseconds.
    pub fn retry_after_ms(&self) -> u64 {
        let millis = self.retry_after.as_millis();
        let rounded = if self.retry_after.subsec_nanos() % 1_000_000 == 0 { millis } else { millis + 1 };
        u64::try_from(rounded).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

type WindowMap = Arc<Mutex<HashMap<String, Window>>>;

struct Sweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Fixed-window rate limiter.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use docketsync_common::resilience::{RateLimiter, RateLimiterConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RateLimiterConfig::builder().max_requests(2).window_ms(60_000).build()?;
/// let limiter = RateLimiter::new(config);
///
/// assert!(limiter.check("user1").allowed);
/// assert!(limiter.check("user1").allowed);
/// assert!(!limiter.check("user1").allowed);
/// # Ok(())
/// # }
/// ```
pub struct RateLimiter<C: Clock = SystemClock> {
    config: RateLimiterConfig,
    windows: WindowMap,
    clock: Arc<C>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl RateLimiter<SystemClock> {
    /// Create a limiter backed by the system clock.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter with a custom clock.
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(clock),
            sweeper: Mutex::new(None),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Record a request for `key` and decide whether it may proceed.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let window_len = self.config.window;
        let mut windows = self.windows.lock();

        let window =
            windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });

        if now.duration_since(window.started) >= window_len {
            trace!(key, "rate limit window reset");
            *window = Window { started: now, count: 0 };
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            return RateLimitDecision::allow();
        }

        let decision =
            RateLimitDecision::deny(window_len.saturating_sub(now.duration_since(window.started)));
        debug!(key, retry_after_ms = decision.retry_after_ms(), "rate limit exceeded");
        decision
    }

    /// Forget the window for `key`.
    pub fn reset(&self, key: &str) {
        self.windows.lock().remove(key);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.windows, self.clock.now(), self.config.window)
    }

    /// Start a background task that purges expired windows every `interval`.
    ///
    /// Calling this twice replaces the previous sweeper. Must be called from
    /// within a Tokio runtime.
    pub fn start_sweeper(&self, interval: Duration) {
        self.shutdown();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let windows = Arc::clone(&self.windows);
        let clock = Arc::clone(&self.clock);
        let window_len = self.config.window;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = purge(&windows, clock.now(), window_len);
                        if removed > 0 {
                            trace!(removed, "purged expired rate limit windows");
                        }
                    }
                }
            }
        });

        *self.sweeper.lock() = Some(Sweeper { cancel, handle });
    }

    /// Whether a background sweeper is running.
    pub fn has_sweeper(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Stop the background sweeper, if any. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.cancel.cancel();
            sweeper.handle.abort();
            debug!("rate limiter sweeper stopped");
        }
    }
}

impl<C: Clock> Drop for RateLimiter<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn purge(windows: &WindowMap, now: Instant, window_len: Duration) -> usize {
    let mut windows = windows.lock();
    let before = windows.len();
    windows.retain(|_, window| now.duration_since(window.started) < window_len);
    before - windows.len()
}

#[cfg(test)]
mod tests {
    use super::super::MockClock;
    use super::*;

    fn limiter(max_requests: u32, window_ms: u64) -> (RateLimiter<MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = RateLimiterConfig::builder()
            .max_requests(max_requests)
            .window_ms(window_ms)
            .build()
            .unwrap();
        (RateLimiter::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn denies_after_max_requests_inside_window() {
        let (limiter, _clock) = limiter(2, 60_000);

        assert!(limiter.check("user1").allowed);
        assert!(limiter.check("user1").allowed);

        let denied = limiter.check("user1");
        assert!(!denied.allowed);
        assert!(denied.retry_after_ms() > 0);
        assert!(denied.retry_after <= Duration::from_secs(60));
    }

    #[test]
    fn allows_again_after_window_elapses() {
        let (limiter, clock) = limiter(2, 60_000);

        limiter.check("user1");
        limiter.check("user1");
        assert!(!limiter.check("user1").allowed);

        clock.advance_millis(60_000);
        assert!(limiter.check("user1").allowed);
    }

    #[test]
    fn retry_after_shrinks_as_time_passes() {
        let (limiter, clock) = limiter(1, 10_000);

        limiter.check("k");
        clock.advance_millis(4_000);
        let denied = limiter.check("k");
        assert_eq!(denied.retry_after, Duration::from_millis(6_000));
        assert_eq!(denied.retry_after_ms(), 6_000);
    }

    #[test]
    fn retry_after_ms_saturates_instead_of_truncating() {
        assert_eq!(RateLimitDecision::deny(Duration::MAX).retry_after_ms(), u64::MAX);
        assert_eq!(RateLimitDecision::deny(Duration::from_micros(1)).retry_after_ms(), 1);
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter(1, 60_000);

        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn window_starts_at_first_request_of_key() {
        let (limiter, clock) = limiter(1, 1_000);

        assert!(limiter.check("a").allowed);
        clock.advance_millis(600);
        assert!(limiter.check("b").allowed);
        clock.advance_millis(500);

        // "a" window expired at 1000ms, "b" still open until 1600ms
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("b").allowed);
    }

    #[test]
    fn purge_drops_only_expired_windows() {
        let (limiter, clock) = limiter(5, 1_000);

        limiter.check("old");
        clock.advance_millis(800);
        limiter.check("fresh");
        clock.advance_millis(300);

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn reset_forgets_key() {
        let (limiter, _clock) = limiter(1, 60_000);
        limiter.check("a");
        assert!(!limiter.check("a").allowed);
        limiter.reset("a");
        assert!(limiter.check("a").allowed);
    }

    #[test]
    fn config_validation() {
        assert_eq!(
            RateLimiterConfig::builder().max_requests(0).build(),
            Err(ConfigError::ZeroMaxRequests)
        );
        assert_eq!(
            RateLimiterConfig::builder().window(Duration::ZERO).build(),
            Err(ConfigError::ZeroWindow)
        );
    }

    #[tokio::test]
    async fn shutdown_stops_sweeper() {
        let (limiter, _clock) = limiter(1, 1_000);

        limiter.start_sweeper(Duration::from_millis(10));
        assert!(limiter.has_sweeper());

        limiter.shutdown();
        assert!(!limiter.has_sweeper());

        // Idempotent
        limiter.shutdown();
    }

    #[tokio::test]
    async fn sweeper_purges_in_background() {
        let (limiter, clock) = limiter(1, 1_000);
        limiter.check("a");
        clock.advance_millis(2_000);

        limiter.start_sweeper(Duration::from_millis(5));
        for _ in 0..50 {
            if limiter.tracked_keys() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(limiter.tracked_keys(), 0);
        limiter.shutdown();
    }
}
