//! Application Layer - Port definitions.
//!
//! Contracts that infrastructure adapters implement and that the
//! supervisor is written against, so real sockets can be swapped for
//! fakes in tests.

/// Port interfaces for transport, credentials, and consumers.
pub mod ports;
