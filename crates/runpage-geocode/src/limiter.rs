//! Minimum-spacing rate limiter for outbound geocoding calls.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Spacing AMap's free tier tolerates between consecutive requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(800);

/// Enforces a minimum interval between consecutive calls.
///
/// Clones share the same last-call timestamp, so one limiter can be handed
/// to several clients. Callers block inside [`RateLimiter::acquire`] until
/// their slot comes up; concurrent callers are served one after another.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleeps until `min_interval` has passed since the previous call, then
    /// records this call. Returns how long it slept.
    pub fn acquire(&self) -> Duration {
        let mut last_call = match self.last_call.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A panicking holder can only leave a stale timestamp behind.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                tracing::debug!(wait_ms = waited.as_millis() as u64, "rate limit: waiting");
                std::thread::sleep(waited);
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}
