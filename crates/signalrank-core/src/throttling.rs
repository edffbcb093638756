use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces successive provider calls at least `interval` apart.
///
/// The first call passes immediately; each following call waits until one
/// interval has elapsed since the previous one. A zero interval disables
/// pacing.
#[derive(Clone)]
pub struct Pacer {
    interval: Duration,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { interval, limiter }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait for the next slot.
    pub async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn zero_interval_disables_pacing() {
        let pacer = Pacer::disabled();
        assert!(!pacer.is_enabled());
    }

    #[tokio::test]
    async fn first_slot_is_immediate_and_second_waits() {
        let pacer = Pacer::new(Duration::from_millis(50));
        let started = Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() < Duration::from_millis(40));

        pacer.pace().await;
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
