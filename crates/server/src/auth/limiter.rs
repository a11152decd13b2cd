use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use tracing::debug;

use crate::error::RequestError;

/// Keys tracked before stale ones are dropped for the first time.
const PRUNE_THRESHOLD: usize = 1024;

type KeyedLimiter<C> =
    RateLimiter<String, DashMapStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Per-email limit on login and registration attempts. Keys whose bucket has
/// fully refilled are dropped once the map outgrows its threshold, so
/// submitting ever new emails cannot grow it without bound.
pub struct AuthLimiter<C: Clock = DefaultClock> {
    limiter: KeyedLimiter<C>,
    prune_threshold: usize,
    next_prune: AtomicUsize,
}

impl AuthLimiter {
    pub fn new(attempts_per_minute: NonZeroU32) -> Self {
        Self::with_clock(
            Quota::per_minute(attempts_per_minute),
            DefaultClock::default(),
            PRUNE_THRESHOLD,
        )
    }
}

impl<C: Clock> AuthLimiter<C> {
    pub fn with_clock(quota: Quota, clock: C, prune_threshold: usize) -> Self {
        Self {
            limiter: RateLimiter::dashmap_with_clock(quota, clock),
            prune_threshold,
            next_prune: AtomicUsize::new(prune_threshold),
        }
    }

    pub fn check(&self, email: &str) -> Result<(), RequestError> {
        let result = self.limiter.check_key(&email.trim().to_lowercase());
        if self.limiter.len() > self.next_prune.load(Ordering::Relaxed) {
            self.prune();
        }
        result.map_err(|_| RequestError::RateLimited)
    }

    fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        let live = self.limiter.len();
        // keys still inside their window stay, wait for the map to double before the next pass
        self.next_prune
            .store(live.saturating_mul(2).max(self.prune_threshold), Ordering::Relaxed);
        debug!("auth limiter pruned {} of {before} keys", before.saturating_sub(live));
    }

    #[cfg(test)]
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}
