//! Scheduler for batching tasks and retrying failed ones
//!
//! This module handles:
//! - Splitting a task list into fixed-size batches
//! - The pause inserted between batches
//! - Caller-side retries with exponential backoff

use crate::config::CoordinatorConfig;
use std::future::Future;
use std::time::Duration;

/// Retry behavior for a single task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each later one
    pub base_delay: Duration,

    /// Cap on a single backoff delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails with an error `should_retry`
    /// rejects, or runs out of attempts. The last error is returned.
    pub async fn run<T, E, F, Fut, R>(&self, mut operation: F, should_retry: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && should_retry(&e) => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "Attempt {} failed ({}), retrying in {:?}",
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Batching and pacing knobs for one coordinator run
#[derive(Debug, Clone)]
pub struct Scheduler {
    workers: usize,
    batch_size: usize,
    batch_delay: Duration,
    progress_every: usize,
    retry: RetryPolicy,
}

impl Scheduler {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            workers: config.workers.max(1) as usize,
            batch_size: config.batch_size.max(1) as usize,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            progress_every: config.progress_every.max(1) as usize,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.retry_backoff_ms),
                ..RetryPolicy::default()
            },
        }
    }

    /// Maximum tasks in flight at once
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn progress_every(&self) -> usize {
        self.progress_every
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Splits `tasks` into batches, each paired with the index of its first task
    pub fn batches<'a, T>(&self, tasks: &'a [T]) -> impl Iterator<Item = (usize, &'a [T])> {
        let size = self.batch_size;
        tasks
            .chunks(size)
            .enumerate()
            .map(move |(n, chunk)| (n * size, chunk))
    }

    /// Waits out the gap between two batches
    pub async fn pause_between_batches(&self) {
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
    }
}
