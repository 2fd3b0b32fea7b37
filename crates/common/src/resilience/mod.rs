//! Resilience primitives for outbound provider traffic
//!
//! - **Clock**: monotonic time abstraction so windowed logic can be tested
//!   without sleeping
//! - **Rate Limiter**: fixed-window request gate keyed by an arbitrary string
//!
//! The rate limiter is used both by the batch orchestrator (one key per
//! practice credential) and by the inbound trigger endpoints (one key per
//! caller).

pub mod clock;
pub mod rate_limiter;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{
    ConfigError, RateLimitDecision, RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder,
};
