//! Exponential backoff retrier with optional jitter.
//!
//! Retries only timeout-class network failures; status-code decisions belong
//! to the HTTP-aware decorator in the client, which delegates its timing to
//! this (or any other) wrapped retrier.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::Retrier;
use crate::errors::TransportError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Backoff retrier: `initial_delay * multiplier^(attempt-1)`, capped at
/// `max_delay`, with full jitter unless disabled.
#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetrier {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Default for ExponentialBackoffRetrier {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: true,
        }
    }
}

impl ExponentialBackoffRetrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt ceiling. Zero is ignored.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        if max_attempts > 0 {
            self.max_attempts = max_attempts;
        }
        self
    }

    /// Set the first delay. Zero is ignored.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        if !delay.is_zero() {
            self.initial_delay = delay;
        }
        self
    }

    /// Set the delay cap. Zero is ignored.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        if !delay.is_zero() {
            self.max_delay = delay;
        }
        self
    }

    /// Set the growth factor. Values at or below zero are ignored.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        if multiplier > 0.0 {
            self.multiplier = multiplier;
        }
        self
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let raw = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let seconds = if self.jitter {
            capped * (0.5 + 0.5 * rand::random::<f64>())
        } else {
            capped
        };
        Duration::from_secs_f64(seconds)
    }
}

/// Whether any node in the chain is a timeout-class failure.
fn is_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(req) = e.downcast_ref::<reqwest::Error>() {
            if req.is_timeout() {
                return true;
            }
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        if e.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
            return true;
        }
        current = e.source();
    }
    false
}

#[async_trait]
impl Retrier for ExponentialBackoffRetrier {
    fn should_retry(&self, err: &(dyn std::error::Error + 'static), _attempt: u32) -> bool {
        is_timeout(err)
    }

    async fn wait(&self, cancel: &CancellationToken, attempt: u32) -> Result<(), TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        let delay = self.delay_for(attempt);
        tracing::debug!(attempt, ?delay, "backing off before retry");
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
