//! Time source used by the poller.
//!
//! Production code sleeps on the Tokio timer; tests swap in
//! [`ManualClock`], which advances instantly and records every wait.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

/// Monotonic clock plus an async delay.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated clock: `sleep` returns immediately after advancing time.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.state.lock().offset += by;
    }

    /// Total simulated time elapsed.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().offset
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().offset
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}
