//! Error types for the transport client.
//!
//! This module defines a unified error enumeration used across client
//! construction, request dispatch, pkt-line framing, and wire-error detection.
//! It integrates with `thiserror` to provide rich `Display` implementations and
//! error source chaining where applicable.
//!
//! Notes:
//! - [`ServerUnavailableError`] is a distinct struct so it stays matchable
//!   through any number of wrapping layers via [`find_server_unavailable`].
//! - Network failures from `reqwest` pass through unwrapped in
//!   [`TransportError::Http`]; they are never folded into other variants.

use std::fmt;

use thiserror::Error;

/// Boxed error used for chained causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The server answered with a 5xx (or 429) status: the request may be worth
/// retrying depending on the HTTP method that produced it.
///
/// `operation` is the HTTP method as a string and may be empty when unknown;
/// retry policy treats an empty operation conservatively (no retry on 5xx).
#[derive(Debug)]
pub struct ServerUnavailableError {
    /// HTTP method of the failed request (`"GET"`, `"POST"`, ...; may be empty).
    pub operation: String,
    /// The status code the server answered with.
    pub status_code: u16,
    /// The error observed while handling the response, if any.
    pub underlying: Option<BoxError>,
}

impl ServerUnavailableError {
    pub fn new(operation: impl Into<String>, status_code: u16, underlying: Option<BoxError>) -> Self {
        Self {
            operation: operation.into(),
            status_code,
            underlying,
        }
    }
}

impl fmt::Display for ServerUnavailableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server unavailable (status code {})", self.status_code)?;
        if let Some(underlying) = &self.underlying {
            write!(f, ": {underlying}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerUnavailableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.underlying
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Walk `err` and its source chain looking for a [`ServerUnavailableError`].
///
/// Matching is by type, not identity, so the error stays recognizable no matter
/// how many layers of context have been wrapped around it.
pub fn find_server_unavailable<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> Option<&'a ServerUnavailableError> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(unavailable) = e.downcast_ref::<ServerUnavailableError>() {
            return Some(unavailable);
        }
        current = e.source();
    }
    None
}

/// Unified error enumeration for the transport client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The repository URL is empty or does not parse.
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    /// The repository URL uses a scheme other than http/https.
    #[error("unsupported URL scheme: {0} (only http and https are supported)")]
    UnsupportedScheme(String),

    /// Both basic and token auth were configured.
    #[error("cannot use both basic auth and token auth")]
    ConflictingAuth,

    /// Basic auth was configured with an empty username.
    #[error("username cannot be empty")]
    EmptyUsername,

    /// Token auth was configured with an empty token.
    #[error("token cannot be empty")]
    EmptyToken,

    /// Unknown git service name.
    #[error("invalid service: {0}")]
    InvalidService(String),

    /// Terminal non-2xx response (4xx other than 429).
    #[error("got status code {status}: {text}")]
    UnexpectedStatus { status: u16, text: String },

    /// Retry-eligible 5xx/429 response.
    #[error("{0}")]
    ServerUnavailable(#[from] ServerUnavailableError),

    /// Git-level failure reported inside an HTTP 200 body (`ERR` packet or a
    /// `fatal:`/`error:` message).
    #[error("git server error: {0}")]
    GitServer(String),

    /// The server rejected a reference update during receive-pack.
    #[error("reference update failed for {refname}: {reason}")]
    RefUpdate { refname: String, reason: String },

    /// The server failed to unpack the objects it was sent.
    #[error("git unpack error: {0}")]
    Unpack(String),

    /// Malformed pkt-line length header.
    #[error("invalid pkt-line length {0:?}")]
    InvalidPktLength(String),

    /// The stream ended before a pkt-line's declared payload.
    #[error("truncated pkt-line: need {expected} bytes, have {actual}")]
    TruncatedPktLine { expected: usize, actual: usize },

    /// A payload too large for a single pkt-line frame.
    #[error("pkt-line payload of {0} bytes exceeds the 65516 byte maximum")]
    OversizedPktPayload(usize),

    /// Network-level failure, passed through from the HTTP client.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl TransportError {
    /// Chain-aware accessor for the server-unavailable condition.
    pub fn server_unavailable(&self) -> Option<&ServerUnavailableError> {
        find_server_unavailable(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("while pushing refs: {source}")]
    struct PushContext {
        #[source]
        source: TransportError,
    }

    fn unavailable(operation: &str, status: u16) -> ServerUnavailableError {
        ServerUnavailableError::new(
            operation,
            status,
            Some(Box::new(std::io::Error::other("upstream closed"))),
        )
    }

    #[test]
    fn server_unavailable_display_mentions_status_and_cause() {
        let err = unavailable("GET", 503);
        let msg = err.to_string();
        assert!(msg.contains("server unavailable"));
        assert!(msg.contains("503"));
        assert!(msg.contains("upstream closed"));
    }

    #[test]
    fn server_unavailable_source_is_underlying() {
        let err = unavailable("GET", 500);
        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "upstream closed");

        let bare = ServerUnavailableError::new("GET", 500, None);
        assert!(std::error::Error::source(&bare).is_none());
    }

    #[test]
    fn find_matches_direct_error() {
        let err = unavailable("GET", 502);
        let found = find_server_unavailable(&err).expect("should match itself");
        assert_eq!(found.status_code, 502);
        assert_eq!(found.operation, "GET");
    }

    #[test]
    fn find_matches_through_wrapping_layers() {
        let wrapped = PushContext {
            source: TransportError::ServerUnavailable(unavailable("POST", 503)),
        };
        let found = find_server_unavailable(&wrapped).expect("should match through the chain");
        assert_eq!(found.status_code, 503);
        assert_eq!(found.operation, "POST");
    }

    #[test]
    fn find_rejects_unrelated_errors() {
        let err = TransportError::UnexpectedStatus {
            status: 404,
            text: "Not Found".to_string(),
        };
        assert!(find_server_unavailable(&err).is_none());
        assert!(err.server_unavailable().is_none());
    }

    #[test]
    fn unexpected_status_display() {
        let err = TransportError::UnexpectedStatus {
            status: 404,
            text: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "got status code 404: Not Found");
    }

    #[test]
    fn ref_update_display() {
        let err = TransportError::RefUpdate {
            refname: "refs/heads/main".to_string(),
            reason: "failed to update ref".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "reference update failed for refs/heads/main: failed to update ref"
        );
    }
}
