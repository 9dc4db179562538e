//! Fixed-schedule retry for mutating remote calls.
//!
//! A freshly created IAM role is often reported as created before IoT
//! Analytics can assume it, so the first `CreateChannel` or `UpdateDatastore`
//! naming that role fails and a later one succeeds. [`MutationRetrier`] masks
//! this by replaying the call on a fixed schedule. It does not look at the
//! error: every failure is retried, and when the schedule is exhausted the
//! error of the final attempt is returned unchanged.
//!
//! ```text
//! attempt 1 -> 1s -> attempt 2 -> 2s -> attempt 3 -> 5s -> attempt 4
//!           -> 8s -> attempt 5 -> 10s -> attempt 6 -> give up
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Gaps between attempts, in seconds, used unless configured otherwise.
pub const DEFAULT_RETRY_DELAYS_SECS: [u64; 5] = [1, 2, 5, 8, 10];

/// The delays slept between consecutive attempts.
///
/// A schedule with `n` delays makes `n + 1` attempts. Nothing is slept after
/// the final attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    /// Build a schedule from explicit delays.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Build a schedule from whole-second delays.
    pub fn from_secs(secs: &[u64]) -> Self {
        Self::new(secs.iter().copied().map(Duration::from_secs).collect())
    }

    /// A schedule making `attempts` attempts with no delay between them.
    ///
    /// At least one attempt is always made.
    pub fn immediate(attempts: usize) -> Self {
        Self::new(vec![Duration::ZERO; attempts.saturating_sub(1)])
    }

    /// Total number of attempts.
    pub fn attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// The delays between attempts, in order.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Time slept when every attempt fails.
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_secs(&DEFAULT_RETRY_DELAYS_SECS)
    }
}

/// Runs a mutating operation until it succeeds or the schedule runs out.
///
/// The retrier keeps no state between invocations; one instance can be shared
/// by every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRetrier {
    schedule: RetrySchedule,
}

impl MutationRetrier {
    /// Create a retrier with the given schedule.
    pub fn new(schedule: RetrySchedule) -> Self {
        Self { schedule }
    }

    /// The schedule this retrier follows.
    pub fn schedule(&self) -> &RetrySchedule {
        &self.schedule
    }

    /// Invoke `op` until it returns `Ok`, sleeping between failed attempts.
    ///
    /// `operation` names the remote call in log output. When every attempt
    /// fails the error from the last attempt is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.schedule.attempts();
        let mut delays = self.schedule.delays.iter();
        let mut attempt = 1usize;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "mutation succeeded after retrying");
                    }
                    return Ok(value);
                },
                Err(err) => match delays.next() {
                    Some(delay) => {
                        warn!(
                            operation,
                            attempt,
                            attempts,
                            delay = ?delay,
                            error = %err,
                            "mutation failed, retrying"
                        );
                        tokio::time::sleep(*delay).await;
                        attempt += 1;
                    },
                    None => {
                        warn!(operation, attempts, error = %err, "mutation failed on final attempt");
                        return Err(err);
                    },
                },
            }
        }
    }
}
