// SPDX-FileCopyrightText: 2026 Quarry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy: how many attempts, how long to wait, and whom to tell.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quarry_core::QuarryError;

/// Wait used by [`Backoff::Default`].
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// "Still working" notes posted during long waits, indexed by retry count.
pub const PROGRESS_MESSAGES: &[&str] = &[
    ":hourglass_flowing_sand: Still working on it...",
    ":mag: Digging through the tables, hang tight.",
    ":gear: The query engine is still crunching.",
    ":coffee: This one is taking a while. Thanks for waiting.",
    ":bar_chart: Lining up the numbers...",
    ":construction: Almost there, the service is busy.",
    ":turtle: Slow going today, still on it.",
];

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same number of seconds every time.
    Fixed(u64),
    /// `base ^ retry` seconds.
    Exponential(u32),
    /// [`DEFAULT_DELAY`].
    Default,
}

impl Backoff {
    /// Delay before the next attempt, after `retry` failures (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(secs) => Duration::from_secs(secs),
            Self::Exponential(base) => Duration::from_secs(u64::from(base).saturating_pow(retry)),
            Self::Default => DEFAULT_DELAY,
        }
    }
}

/// Out-of-band channel for progress notes, typically the originating thread.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), QuarryError>;
}

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry budget, backoff and optional progress sink for one `call`.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
            progress: None,
        }
    }

    /// Budget for submissions and single calls: exponential, base 2.
    pub fn short(max_retries: u32) -> Self {
        Self::new(max_retries, Backoff::Exponential(2))
    }

    /// Budget for the long-running poll and fetch steps: default delay.
    pub fn long(max_retries: u32) -> Self {
        Self::new(max_retries, Backoff::Default)
    }

    pub fn with_progress(mut self, progress: Option<Arc<dyn ProgressSink>>) -> Self {
        self.progress = progress;
        self
    }

    /// The note to post after `retry` failures, if any.
    ///
    /// Only prime retry counts notify, so notes thin out as the wait grows.
    pub fn progress_note(&self, retry: u32) -> Option<&'static str> {
        if self.progress.is_none() || !is_prime(retry) {
            return None;
        }
        Some(PROGRESS_MESSAGES[retry as usize % PROGRESS_MESSAGES.len()])
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

pub fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}
