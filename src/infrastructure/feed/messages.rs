//! Outbound Wire Types
//!
//! Requests this client sends to the feed. There is exactly one: the
//! subscribe request, sent once per successful connection and covering the
//! full topic set.
//!
//! # Wire Format (JSON)
//!
//! ```json
//! {"symbol": ["NSE:SBIN-EQ", "NSE:RELIANCE-EQ"], "type": "symbolUpdate"}
//! ```

use serde::{Deserialize, Serialize};

/// Request type discriminator for per-instrument update streams.
pub const SYMBOL_UPDATE: &str = "symbolUpdate";

/// Subscribe request covering a set of topics.
///
/// Field order matters for byte-for-byte payload stability across
/// reconnects: `symbol` first, then `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Topics to subscribe to, in registration order.
    pub symbol: Vec<String>,
    /// Request type discriminator.
    #[serde(rename = "type")]
    pub kind: String,
}

impl SubscribeRequest {
    /// Build a symbol-update subscribe request.
    #[must_use]
    pub fn symbol_update(symbols: Vec<String>) -> Self {
        Self {
            symbol: symbols,
            kind: SYMBOL_UPDATE.to_string(),
        }
    }

    /// Serialize to the JSON text sent over the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen with
    /// valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
