//! Drives a submitted job to a terminal state.
//!
//! Each tick fetches status once. A terminal status ends the loop; otherwise
//! the elapsed budget is checked and the loop waits exactly one interval.
//! Only one status request is ever in flight per job.
//!
//! Boundary policy: the timeout check runs after the fetch and trips when
//! elapsed time reaches the timeout (`>=`). A terminal status seen on that
//! same tick still wins, so with `timeout = 5 * interval` a job that never
//! finishes fails on the 6th fetch, after 5 waits.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidstage_common::{Error, Result};

use crate::client::GenerationJobClient;
use crate::clock::{Clock, TokioClock};
use crate::job::GenerationJob;

/// Default delay between status fetches.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1500);

/// Default wall-clock budget for one job.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval: Duration,
    timeout: Duration,
}

impl PollConfig {
    /// Both durations must be positive and `interval <= timeout`.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self> {
        if interval.is_zero() || timeout.is_zero() {
            return Err(Error::config("poll interval and timeout must be positive"));
        }
        if interval > timeout {
            return Err(Error::config(format!(
                "poll interval {interval:?} exceeds timeout {timeout:?}"
            )));
        }
        Ok(Self { interval, timeout })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// What the caller sees on every tick, changed or not.
#[derive(Debug, Clone, Copy)]
pub struct PollTick<'a> {
    /// 1-based fetch count.
    pub attempt: u32,
    /// Time since polling started.
    pub elapsed: Duration,
    pub job: &'a GenerationJob,
}

/// Status-polling loop for one job at a time.
pub struct JobPoller {
    config: PollConfig,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl JobPoller {
    pub fn new(config: PollConfig) -> Self {
        Self::with_clock(config, Arc::new(TokioClock))
    }

    pub fn with_clock(config: PollConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop polling early when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until terminal, logging each tick.
    pub async fn poll<C>(&self, client: &C, job_id: &str) -> Result<GenerationJob>
    where
        C: GenerationJobClient + ?Sized,
    {
        self.poll_with(client, job_id, |_| {}).await
    }

    /// Poll until terminal, handing every tick to `on_tick`.
    ///
    /// Returns the terminal job as reported, including `failed` jobs. Errors
    /// from a status fetch abort the loop immediately.
    pub async fn poll_with<C, F>(&self, client: &C, job_id: &str, mut on_tick: F) -> Result<GenerationJob>
    where
        C: GenerationJobClient + ?Sized,
        F: FnMut(&PollTick<'_>) + Send,
    {
        let started = self.clock.now();
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    job_id: job_id.to_string(),
                });
            }

            attempt += 1;
            let job = client.fetch_status(job_id).await.inspect_err(|e| {
                warn!(job_id, attempt, error = %e, "status fetch failed; aborting poll");
            })?;
            let elapsed = self.clock.now().saturating_duration_since(started);

            info!(
                provider = client.name(),
                job_id,
                attempt,
                status = %job.status,
                progress = ?job.progress,
                "poll tick"
            );
            on_tick(&PollTick {
                attempt,
                elapsed,
                job: &job,
            });

            if job.is_terminal() {
                debug!(job_id, attempt, ?elapsed, "job reached terminal status");
                return Ok(job);
            }

            if elapsed >= self.config.timeout {
                warn!(job_id, attempt, ?elapsed, "poll timeout exceeded");
                return Err(Error::Timeout {
                    job_id: job_id.to_string(),
                    elapsed,
                });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(Error::Cancelled { job_id: job_id.to_string() });
                }
                _ = self.clock.sleep(self.config.interval) => {}
            }
        }
    }
}
