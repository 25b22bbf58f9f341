//! Per-host rate limiting.
//!
//! Requests to the same host are spaced by a configured interval, randomized
//! by a jitter of up to half the interval in either direction. Requests to
//! different hosts never wait for each other.
//!
//! # Architecture
//!
//! - [`HostKey`]: Represents a host (and explicit port) for rate limiting
//! - [`HostRateLimiter`]: Owns the per-host dispatch timestamps and exposes
//!   only [`HostRateLimiter::gate`]
//! - [`JitterSource`]: Where the random part of each wait comes from

mod key;
mod limiter;

pub use key::HostKey;
pub use limiter::{HostRateLimiter, JitterSource, RandomJitter};
