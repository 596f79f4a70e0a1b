//! Domain Layer - Core streaming types and business logic.
//!
//! This layer contains the core types for feed streaming with no
//! transport dependencies.

/// Decoded message types (kind + payload).
pub mod message;

/// Subscription topic tracking.
pub mod subscription;
