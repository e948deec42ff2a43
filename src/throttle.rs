//! Minimum-interval pacing for outbound registry calls
//!
//! The registry allows roughly 50 requests a minute. A [`Throttle`] makes
//! callers wait until the configured interval has passed since the most
//! recent recorded call. State is per instance; separate processes (or
//! separate throttles) do not coordinate.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Default spacing between registry calls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Enforces a minimum wall-clock gap between calls
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for the call slot, records it, and returns how long it waited
    ///
    /// The lock is held while sleeping, so concurrent callers queue up and
    /// each one is spaced from the call recorded just before it.
    pub async fn wait(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                debug!(waited_ms = waited.as_millis() as u64, "Throttling registry call");
                sleep(waited).await;
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}
