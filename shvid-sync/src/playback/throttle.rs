//! Outbound time-update throttling
//!
//! The rate-limit policy is injected into the reconciler; [`IntervalThrottle`]
//! is the default.

use governor::clock::{Clock, DefaultClock};
use governor::{Quota, RateLimiter};
use std::time::Duration;

/// Decides whether an outbound update may be sent now
pub trait Throttle: Send {
    fn admit(&mut self) -> bool;
}

type DirectLimiter<C> = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    C,
    governor::middleware::NoOpMiddleware<<C as Clock>::Instant>,
>;

/// Leading-edge throttle: the first update passes, then at most one per interval
///
/// Backed by a GCRA limiter with a burst of one. A zero interval disables
/// throttling.
pub struct IntervalThrottle<C: Clock = DefaultClock> {
    interval: Duration,
    limiter: Option<DirectLimiter<C>>,
}

impl IntervalThrottle {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, DefaultClock::default())
    }
}

impl<C: Clock> IntervalThrottle<C> {
    /// Throttle driven by a custom clock
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        let limiter =
            Quota::with_period(interval).map(|quota| RateLimiter::direct_with_clock(quota, clock));
        Self { interval, limiter }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<C> Throttle for IntervalThrottle<C>
where
    C: Clock + Send,
    C::Instant: Send,
{
    fn admit(&mut self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }
}
