//! Dispatch pacing for detailed scans.
//!
//! Spaces out the *start* of detailed scans so new connections against the
//! target network are initiated at a bounded rate, however long each scan
//! runs afterwards.

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// governor clock backed by tokio's time source, so a paused runtime clock
/// paces dispatches too.
#[derive(Debug, Clone, Copy, Default)]
struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        Instant::now().into_std()
    }
}

type Gcra = GovLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<std::time::Instant>>;

/// A global dispatch gate.
///
/// A quota of one cell per `delay` with no burst: a slot is granted no
/// sooner than `delay` after the previous grant, no matter which worker
/// asks. Clones share the same gate. A zero delay disables pacing.
#[derive(Clone)]
pub struct RateLimiter {
    delay: Duration,
    gate: Option<Arc<Gcra>>,
}

impl RateLimiter {
    /// Create a gate with the given minimum spacing between grants.
    pub fn new(delay: Duration) -> Self {
        let gate = Quota::with_period(delay)
            .map(|quota| Arc::new(GovLimiter::direct_with_clock(quota, TokioClock)));
        Self { delay, gate }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for a dispatch slot and return the instant it was granted.
    pub async fn acquire(&self) -> Instant {
        if let Some(gate) = &self.gate {
            while let Err(not_until) = gate.check() {
                sleep_until(Instant::from_std(not_until.earliest_possible())).await;
            }
        }
        Instant::now()
    }
}
