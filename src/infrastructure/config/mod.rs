//! Configuration Module
//!
//! Environment-driven configuration for the feed client.

mod settings;

pub use settings::{ConfigError, DispatchSettings, FeedConfig, WebSocketSettings};
