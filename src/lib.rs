//! nanogit: a transport-layer client for Git's smart HTTP protocol. It covers capability
//! discovery, fetch (upload-pack), and push (receive-pack) over plain HTTP, with
//! authentication and idempotency-aware retries.
//!
//! Goals
//! - Speak the smart HTTP protocol directly: `info/refs` discovery, `git-upload-pack`,
//!   and `git-receive-pack`, nothing more.
//! - Detect git-level failures that servers embed in otherwise-successful (HTTP 200)
//!   responses, such as `ng <ref> <reason>` report lines and `ERR` packets.
//! - Retry only what is safe to retry: idempotent requests on 5xx, anything on 429,
//!   never a consumed POST body.
//!
//! Core Capabilities
//! - Client construction: URL normalization (`.git` suffix, http/https only), basic or
//!   token authentication, injectable `reqwest::Client`.
//! - Wire parsing: incremental pkt-line reader/writer and an error detector for
//!   receive-pack report streams.
//! - Retry: a pluggable [`Retrier`] capability plus an HTTP-aware decorator that knows
//!   which method/status combinations are replayable.
//!
//! Modules
//! - `client`: [`RawClient`] and its builder; the per-operation request loop.
//! - `protocol`: pkt-line framing and wire-error detection.
//! - `retry`: the [`Retrier`] trait, [`NoopRetrier`], [`ExponentialBackoffRetrier`],
//!   and the [`RequestContext`] that carries a retrier and cancellation token.
//! - `errors`: unified error types.
//!
//! Typical Usage
//! - Build a client with [`RawClient::builder`], attach a retrier to a
//!   [`RequestContext`], then call [`RawClient::smart_info`],
//!   [`RawClient::upload_pack`], or [`RawClient::receive_pack`].
//!
//! This crate does not implement the pack-file format, delta negotiation, or any
//! higher-level object model; callers own the bodies they send and the responses
//! they receive.

pub mod client;
pub mod errors;
pub mod protocol;
pub mod retry;

pub use client::{RawClient, RawClientBuilder};
pub use errors::{ServerUnavailableError, TransportError, find_server_unavailable};
pub use protocol::ServiceType;
pub use retry::{ExponentialBackoffRetrier, NoopRetrier, RequestContext, Retrier};
