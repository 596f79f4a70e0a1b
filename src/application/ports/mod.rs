//! Port Interfaces
//!
//! Contracts between the reconnect supervisor and the outside world,
//! following the Hexagonal Architecture pattern.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`Transport`]: opens one physical streaming session
//! - [`FeedConnection`]: one live session handle (send / receive / close)
//! - [`CredentialSource`]: supplies credentials, re-read on each attempt
//!
//! ## Driver Ports (Inbound)
//!
//! - [`Consumer`]: receives decoded messages from the dispatcher

use async_trait::async_trait;

use crate::domain::message::DecodedMessage;
use crate::infrastructure::auth::Credentials;
use crate::infrastructure::config::ConfigError;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by a transport implementation.
///
/// Everything except `Config` is an expected network-level fault the
/// supervisor retries; `Config` marks a precondition failure (missing
/// headers) surfaced before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Required connection headers are missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connection establishment failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// WebSocket protocol or I/O error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Outbound payload could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The session is closed; no further sends are permitted.
    #[error("connection closed")]
    ConnectionClosed,
}

impl TransportError {
    /// Check whether this error is a configuration precondition failure
    /// rather than a network fault.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// =============================================================================
// Connection Events
// =============================================================================

/// Events surfaced by a live connection to the session loop.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// One inbound text frame.
    Frame(String),
    /// Liveness probe response from the server.
    Pong,
    /// Server-initiated probe; must be answered by the session loop.
    Ping(Vec<u8>),
    /// Orderly close initiated by the server.
    Closed {
        /// Close code, when the server supplied one.
        code: Option<u16>,
        /// Close reason, when the server supplied one.
        reason: Option<String>,
    },
}

// =============================================================================
// Headers
// =============================================================================

/// Name of the account identifier header.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Header pair required to open a feed session, derived from credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHeaders {
    /// `Authorization` header value (bearer-style identity token).
    pub authorization: String,
    /// `x-account-id` header value.
    pub account_id: String,
}

// =============================================================================
// Driven Ports
// =============================================================================

/// Supplies credentials for a connection attempt.
///
/// The supervisor calls this on **every** attempt so rotated credentials
/// take effect on the next reconnect without a restart.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialSource: Send + Sync {
    /// Current credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when credentials are missing or malformed.
    fn credentials(&self) -> Result<Credentials, ConfigError>;
}

/// Opens physical streaming sessions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish one session.
    ///
    /// Implementations must fail fast with [`TransportError::Config`] when
    /// required headers are missing, before touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the session cannot be established.
    async fn open(
        &self,
        url: &str,
        headers: &ConnectionHeaders,
    ) -> Result<Box<dyn FeedConnection>, TransportError>;
}

/// One live streaming session.
///
/// Owned exclusively by the supervisor; invalid after `close`.
#[async_trait]
pub trait FeedConnection: Send {
    /// Send one text message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the send fails or the session is
    /// already closed.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a liveness probe.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the probe cannot be sent.
    async fn ping(&mut self) -> Result<(), TransportError>;

    /// Wait for the next connection event.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on receive failure; an orderly server
    /// close is reported as [`ConnectionEvent::Closed`], not an error.
    async fn next_event(&mut self) -> Result<ConnectionEvent, TransportError>;

    /// Tear the session down. Idempotent; safe on an already-closed handle.
    async fn close(&mut self);
}

// =============================================================================
// Driver Ports
// =============================================================================

/// A registered consumer of decoded messages.
///
/// Messages are passed by value; the core makes no assumption about
/// consumer count or behavior. A failing consumer never reaches the
/// transport loop.
pub trait Consumer: Send + Sync {
    /// Handle one decoded message.
    fn on_message(&self, message: DecodedMessage);
}

impl<F> Consumer for F
where
    F: Fn(DecodedMessage) + Send + Sync,
{
    fn on_message(&self, message: DecodedMessage) {
        self(message);
    }
}
