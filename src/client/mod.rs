//! Raw smart-HTTP protocol client.
//!
//! [`RawClient`] speaks the transport layer of the smart protocol: reference
//! advertisement over `GET info/refs`, fetch negotiation over
//! `POST git-upload-pack`, and pushes over `POST git-receive-pack`. It knows
//! nothing about the object model; callers feed it encoded request streams and
//! decode what comes back.
//!
//! Every operation runs through one request loop that applies the retry policy
//! travelling on the [`RequestContext`]: 5xx and 429 responses become
//! [`ServerUnavailableError`] and are offered to the policy, other non-2xx
//! statuses return immediately, and network failures pass through for the
//! wrapped retrier to judge.

mod http_retrier;
mod options;

pub use options::RawClientBuilder;

use bytes::Bytes;
use reqwest::{Method, StatusCode, header};
use tokio_util::sync::CancellationToken;

use self::http_retrier::TemporaryErrorRetrier;
use self::options::Auth;
use crate::errors::{ServerUnavailableError, TransportError};
use crate::protocol::{ServiceType, error_detect, pkt_line};
use crate::retry::{RequestContext, Retrier};

/// Transport-layer client for one repository.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections and is
/// shared between clones.
#[derive(Debug, Clone)]
pub struct RawClient {
    pub(crate) base_url: String,
    pub(crate) auth: Auth,
    pub(crate) user_agent: String,
    pub(crate) http: reqwest::Client,
}

impl RawClient {
    /// Start building a client for the repository at `repo_url`.
    pub fn builder(repo_url: &str) -> RawClientBuilder {
        RawClientBuilder::new(repo_url)
    }

    /// Build a client with default settings (anonymous, default HTTP client).
    pub fn new(repo_url: &str) -> Result<Self, TransportError> {
        Self::builder(repo_url).build()
    }

    /// Normalized base URL, always ending in `.git` when a path is present.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the reference advertisement for `service`.
    ///
    /// Returns the raw advertisement body after validating its pkt-line
    /// framing. The caller parses refs and capabilities out of it.
    pub async fn smart_info(
        &self,
        ctx: &RequestContext,
        service: ServiceType,
    ) -> Result<Bytes, TransportError> {
        let url = format!("{}/info/refs?service={}", self.base_url, service.endpoint());
        let response = self.execute(ctx, Method::GET, &url, None, None).await?;
        let body = response.bytes().await?;
        pkt_line::data_lines(body.clone())?;
        Ok(body)
    }

    /// Whether the configured credentials can read the repository.
    ///
    /// Probes the upload-pack advertisement: any 2xx means authorized, any
    /// terminal client error (401, 403, 404, ...) means not authorized, and
    /// everything else (server unavailable, network failure, cancellation)
    /// propagates as an error.
    pub async fn is_authorized(&self, ctx: &RequestContext) -> Result<bool, TransportError> {
        let url = format!(
            "{}/info/refs?service={}",
            self.base_url,
            ServiceType::UploadPack.endpoint()
        );
        match self.execute(ctx, Method::GET, &url, None, None).await {
            Ok(_) => Ok(true),
            Err(TransportError::UnexpectedStatus { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// POST a want/have negotiation stream to `git-upload-pack`.
    ///
    /// Returns the raw response so the caller can stream the packfile out of
    /// it; the caller owns consuming or dropping it on every path.
    pub async fn upload_pack(
        &self,
        ctx: &RequestContext,
        body: Bytes,
    ) -> Result<reqwest::Response, TransportError> {
        let service = ServiceType::UploadPack;
        let url = format!("{}/{}", self.base_url, service.endpoint());
        self.execute(
            ctx,
            Method::POST,
            &url,
            Some(service.request_content_type()),
            Some(body),
        )
        .await
    }

    /// POST a pack stream to `git-receive-pack` and check the status report.
    ///
    /// A 200 response still fails if the report carries an `ERR` packet, an
    /// `ng` line, an unpack failure, or a `fatal:`/`error:` message.
    pub async fn receive_pack(
        &self,
        ctx: &RequestContext,
        body: Bytes,
    ) -> Result<(), TransportError> {
        let service = ServiceType::ReceivePack;
        let url = format!("{}/{}", self.base_url, service.endpoint());
        let response = self
            .execute(
                ctx,
                Method::POST,
                &url,
                Some(service.request_content_type()),
                Some(body),
            )
            .await?;
        error_detect::scan_response(response.bytes().await?)
    }

    /// Request loop: send, classify, and retry per the context's policy.
    ///
    /// Terminal client errors return before the policy is consulted; 5xx/429
    /// and network failures are offered to it. The loop, not the policy,
    /// enforces the attempt ceiling.
    async fn execute(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        content_type: Option<&'static str>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response, TransportError> {
        let retrier = TemporaryErrorRetrier::new(ctx.retrier());
        let max_attempts = retrier.max_attempts().max(1);
        let cancel = ctx.cancellation();

        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            tracing::debug!(%method, url, attempt, "sending request");

            let err = match self
                .send_once(cancel, method.clone(), url, content_type, body.clone())
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    match classify_status(&method, status) {
                        retryable @ TransportError::ServerUnavailable(_) => retryable,
                        terminal => return Err(terminal),
                    }
                }
                Err(err) => err,
            };

            if attempt >= max_attempts || !retrier.should_retry(&err, attempt) {
                return Err(err);
            }
            tracing::warn!(%method, url, attempt, error = %err, "request failed, retrying");
            retrier.wait(cancel, attempt).await?;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        cancel: &CancellationToken,
        method: Method,
        url: &str,
        content_type: Option<&'static str>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut request = self
            .http
            .request(method, url)
            .header("Git-Protocol", "version=2")
            .header(header::USER_AGENT, &self.user_agent);
        if let Some(value) = self.auth.header_value() {
            request = request.header(header::AUTHORIZATION, value);
        }
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = request.send() => Ok(result?),
        }
    }
}

/// Split a non-2xx status into retry-eligible and terminal errors.
fn classify_status(method: &Method, status: StatusCode) -> TransportError {
    let status_error = TransportError::UnexpectedStatus {
        status: status.as_u16(),
        text: status.to_string(),
    };
    match status.as_u16() {
        429 | 500..600 => TransportError::ServerUnavailable(ServerUnavailableError::new(
            method.as_str(),
            status.as_u16(),
            Some(Box::new(status_error)),
        )),
        _ => status_error,
    }
}
