//! Generic building blocks shared across DocketSync crates.
//!
//! Nothing in here knows about practices, matters or providers; the
//! primitives are reusable by any crate in the workspace.
//!
//! - [`resilience`]: time abstraction and request gating (fixed-window rate
//!   limiter).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;

pub use resilience::{
    Clock, ConfigError, MockClock, RateLimitDecision, RateLimiter, RateLimiterConfig,
    RateLimiterConfigBuilder, SystemClock,
};
