// src/github/rate_limit.rs
// =============================================================================
// The rate gate keeps us under GitHub's hourly API quota.
//
// Before a batch of remote calls (and whenever a call comes back with
// "rate limit exceeded") we ask GitHub how many calls remain. Below the
// floor we sleep a fixed interval and ask again, until the quota resets.
//
// There is exactly one gate per process: the quota is a counter kept on
// GitHub's side and shared by every call we make, so concurrent scans go
// through the same gate and take turns waiting.
// =============================================================================

use super::client::GithubClient;
use super::error::{GithubError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

/// Remaining calls below which we stop and wait
pub const DEFAULT_QUOTA_FLOOR: u64 = 100;

/// Time between two quota checks while waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateGate {
    client: GithubClient,
    floor: u64,
    interval: Duration,
    /// None waits forever, which is what a one-shot catalog rebuild wants
    max_polls: Option<u32>,
    wait_lock: Mutex<()>,
}

impl RateGate {
    pub fn new(client: GithubClient) -> Self {
        Self {
            client,
            floor: DEFAULT_QUOTA_FLOOR,
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
            wait_lock: Mutex::new(()),
        }
    }

    pub fn with_floor(mut self, floor: u64) -> Self {
        self.floor = floor;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Returns true when the remaining quota is at or above the floor.
    ///
    /// A failure of the rate limit call itself is returned to the caller.
    pub async fn check_quota(&self) -> Result<bool> {
        let remaining = self.client.rate_limit_remaining().await?;
        if remaining < self.floor {
            tracing::warn!(remaining, floor = self.floor, "GitHub rate limit is too low");
            return Ok(false);
        }
        tracing::debug!(remaining, "GitHub quota ok");
        Ok(true)
    }

    /// Blocks until `check_quota` passes, polling at a constant interval.
    pub async fn await_quota(&self) -> Result<()> {
        self.wait_for_quota().await.map(|_| ())
    }

    /// Same as `await_quota`, returning how many intervals were slept
    async fn wait_for_quota(&self) -> Result<u32> {
        // One waiter polls at a time; the others queue here and usually
        // find the quota restored once they get the lock.
        let _guard = self.wait_lock.lock().await;

        let mut polls = 0u32;
        while !self.check_quota().await? {
            polls += 1;
            if self.max_polls.is_some_and(|max| polls >= max) {
                return Err(GithubError::QuotaWaitExhausted { polls });
            }
            tokio::time::sleep(self.interval).await;
        }
        Ok(polls)
    }

    /// Runs `op`, waiting for quota and running it again each time it
    /// fails with `QuotaExceeded`. Other results are returned as they are.
    ///
    /// Attempts are at least one interval apart: a secondary rate limit
    /// rejects calls while the core quota still looks healthy.
    pub async fn retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0u32;
        loop {
            match op().await {
                Err(e) if e.is_quota_exceeded() => {
                    attempts += 1;
                    if self.max_polls.is_some_and(|max| attempts > max) {
                        return Err(GithubError::QuotaWaitExhausted { polls: attempts });
                    }
                    tracing::info!(attempt = attempts, "quota exceeded, waiting before retry");
                    let slept = self.wait_for_quota().await.map_err(|e| match e {
                        GithubError::QuotaWaitExhausted { .. } => e,
                        other => GithubError::QuotaCheck(Box::new(other)),
                    })?;
                    if slept == 0 {
                        tokio::time::sleep(self.interval).await;
                    }
                }
                other => return other,
            }
        }
    }
}
