//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the port interfaces defined in the
//! application layer.

/// Credentials and credential sources.
pub mod auth;

/// Configuration loading.
pub mod config;

/// Feed client: codec, heartbeat, reconnect policy, dispatcher, supervisor.
pub mod feed;

/// OpenTelemetry tracing integration.
pub mod telemetry;

/// Real WebSocket transport adapter.
pub mod transport;
