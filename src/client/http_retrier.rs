//! HTTP-aware retry decorator.
//!
//! Wraps whatever [`Retrier`] travels on the request context and adds status
//! code knowledge: 429 is retryable for every method, 5xx only for idempotent
//! ones. Errors that are not server-unavailable fall through to the wrapped
//! policy, so timeout handling stays wherever the caller configured it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::{TransportError, find_server_unavailable};
use crate::retry::{NoopRetrier, Retrier};

pub(crate) struct TemporaryErrorRetrier {
    wrapped: Arc<dyn Retrier>,
}

impl TemporaryErrorRetrier {
    pub(crate) fn new(wrapped: Option<Arc<dyn Retrier>>) -> Self {
        Self {
            wrapped: wrapped.unwrap_or_else(|| Arc::new(NoopRetrier)),
        }
    }
}

/// Whether a failed HTTP exchange may be reissued.
///
/// 429 means the server throttled us and the request was not processed, so
/// any method may retry. 5xx may have partially processed the request, so
/// only idempotent methods retry.
fn is_retryable_operation(operation: &str, status_code: u16) -> bool {
    match status_code {
        429 => true,
        500..600 => matches!(operation, "GET" | "DELETE"),
        _ => false,
    }
}

#[async_trait]
impl Retrier for TemporaryErrorRetrier {
    fn should_retry(&self, err: &(dyn std::error::Error + 'static), attempt: u32) -> bool {
        if let Some(unavailable) = find_server_unavailable(err) {
            return is_retryable_operation(&unavailable.operation, unavailable.status_code);
        }
        self.wrapped.should_retry(err, attempt)
    }

    async fn wait(&self, cancel: &CancellationToken, attempt: u32) -> Result<(), TransportError> {
        self.wrapped.wait(cancel, attempt).await
    }

    fn max_attempts(&self) -> u32 {
        self.wrapped.max_attempts()
    }
}
