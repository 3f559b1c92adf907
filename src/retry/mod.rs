//! Pluggable retry capability consumed by the transport client.
//!
//! [`Retrier`] is the injectable contract: a decision function, a
//! cancellation-aware wait, and an attempt ceiling. The client never schedules
//! backoff itself; it asks whatever retrier travels on the [`RequestContext`].
//! [`ExponentialBackoffRetrier`] is the stock implementation and
//! [`NoopRetrier`] stands in when no retrier is attached.

mod backoff;

pub use backoff::ExponentialBackoffRetrier;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::TransportError;

/// Generic retry capability.
///
/// Implementations must be stateless with respect to a single operation: the
/// client evaluates the decision fresh on every attempt.
#[async_trait]
pub trait Retrier: Send + Sync {
    /// Decide whether `err` is worth another attempt.
    ///
    /// This must not enforce the attempt ceiling; the request loop checks
    /// [`Retrier::max_attempts`] itself.
    fn should_retry(&self, err: &(dyn std::error::Error + 'static), attempt: u32) -> bool;

    /// Sleep before attempt `attempt + 1`.
    ///
    /// Fails with [`TransportError::Cancelled`] if `cancel` is already
    /// cancelled or fires during the sleep.
    async fn wait(&self, cancel: &CancellationToken, attempt: u32) -> Result<(), TransportError>;

    /// Total number of attempts the request loop may issue.
    fn max_attempts(&self) -> u32;
}

/// Retrier that never retries: one attempt, zero wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRetrier;

#[async_trait]
impl Retrier for NoopRetrier {
    fn should_retry(&self, _err: &(dyn std::error::Error + 'static), _attempt: u32) -> bool {
        false
    }

    async fn wait(&self, _cancel: &CancellationToken, _attempt: u32) -> Result<(), TransportError> {
        Ok(())
    }

    fn max_attempts(&self) -> u32 {
        1
    }
}

/// Per-request context: a cancellation token plus an optional retry policy.
///
/// The default context is never cancelled and carries no retrier, which pins
/// every operation to a single attempt.
#[derive(Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    retrier: Option<Arc<dyn Retrier>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a retry policy to this context.
    pub fn with_retrier(mut self, retrier: Arc<dyn Retrier>) -> Self {
        self.retrier = Some(retrier);
        self
    }

    /// Attach a cancellation token to this context.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn retrier(&self) -> Option<Arc<dyn Retrier>> {
        self.retrier.clone()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
