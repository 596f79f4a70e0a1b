#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Symbol Stream - Resilient Market Data Feed Client
//!
//! Maintains a single persistent WebSocket connection to a push-based
//! market data feed, replays the accumulated subscription set after each
//! reconnect, and fans decoded messages out to registered consumers with
//! per-consumer fault isolation.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core feed types with no transport dependencies
//!   - `message`: Decoded message envelope and kind classification
//!   - `subscription`: Accumulated topic set replayed on reconnect
//!
//! - **Application**: Port definitions
//!   - `ports`: Transport, connection, credential and consumer contracts
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `auth`: Credentials and credential sources
//!   - `config`: Environment-driven configuration
//!   - `feed`: Codec, heartbeat, reconnect policy, dispatcher, supervisor
//!   - `transport`: WebSocket transport over `tokio-tungstenite`
//!   - `telemetry`: OpenTelemetry tracing integration
//!
//! # Data Flow
//!
//! ```text
//! Feed WS ----> Supervisor ----> Dispatcher ----> Consumer 1
//!                  |  ^              |       ----> Consumer 2
//!             heartbeat/          bounded    ----> Consumer N
//!             reconnect           queue
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core feed types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::message::{DecodedMessage, MessageKind};
pub use domain::subscription::{Topic, TopicSet};

// Ports
pub use application::ports::{
    ConnectionEvent, ConnectionHeaders, Consumer, CredentialSource, FeedConnection, Transport,
    TransportError,
};

// Auth
pub use infrastructure::auth::{Credentials, EnvCredentialSource, SharedCredentials};

// Configuration
pub use infrastructure::config::{ConfigError, DispatchSettings, FeedConfig, WebSocketSettings};

// Feed client
pub use infrastructure::feed::{
    ConsumerError, DecodeError, DispatchWorker, Dispatcher, FeedSupervisor, HeartbeatConfig,
    JsonCodec, ReconnectConfig, SessionPhase, SubscribeRequest, SupervisorConfig, SupervisorError,
};

// WebSocket transport
pub use infrastructure::transport::WsTransport;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
