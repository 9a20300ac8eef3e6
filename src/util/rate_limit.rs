//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Pose snapshots arrive every 50 ms per client; anything past this is a
/// misbehaving or flooding peer.
pub const MESSAGE_RATE_LIMIT: u32 = 60;

/// Per-connection inbound frame limiter
#[derive(Clone)]
pub struct MessageRateLimiter {
    limiter: Arc<Limiter>,
}

impl MessageRateLimiter {
    pub fn new() -> Self {
        Self {
            limiter: create_limiter(MESSAGE_RATE_LIMIT),
        }
    }

    /// Check if an inbound frame is allowed (returns true if allowed)
    pub fn check_message(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for MessageRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
