//! Decoded Message Types
//!
//! Canonical internal representation of an inbound feed frame after
//! structured decode: a message kind plus an opaque JSON payload.
//! Instrument-specific payload schemas are deliberately not modeled here;
//! consumers interpret the payload themselves.

use chrono::{DateTime, Utc};

/// Kind of a decoded feed message, derived from the frame's `"type"` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Per-instrument update pushed by the feed.
    SymbolUpdate,
    /// Server acknowledgment (subscribe confirmations and the like).
    Ack,
    /// Server-reported error.
    Error,
    /// A typed message this client does not model.
    Other(String),
    /// Frame carried no type discriminator.
    Untyped,
}

impl MessageKind {
    /// Classify a frame from its `"type"` discriminator value.
    #[must_use]
    pub fn from_discriminator(value: Option<&str>) -> Self {
        match value {
            Some("symbolUpdate") => Self::SymbolUpdate,
            Some("ack") | Some("cn") => Self::Ack,
            Some("error") => Self::Error,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Untyped,
        }
    }

    /// Check whether this is a per-instrument data message.
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::SymbolUpdate)
    }
}

/// A decoded inbound message, passed by value to consumers.
///
/// The raw frame is not retained after decode; the payload is the parsed
/// JSON document itself.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// Message kind derived from the frame's type discriminator.
    pub kind: MessageKind,
    /// Full parsed payload.
    pub payload: serde_json::Value,
    /// When this client received the frame.
    pub received_at: DateTime<Utc>,
}

impl DecodedMessage {
    /// Build a decoded message from a parsed payload, classifying its kind.
    #[must_use]
    pub fn from_payload(payload: serde_json::Value) -> Self {
        let kind = MessageKind::from_discriminator(payload.get("type").and_then(|v| v.as_str()));
        Self {
            kind,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Instrument identifier carried by the payload, when present.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.payload.get("symbol").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_symbol_update() {
        let kind = MessageKind::from_discriminator(Some("symbolUpdate"));
        assert_eq!(kind, MessageKind::SymbolUpdate);
        assert!(kind.is_data());
    }

    #[test]
    fn classifies_ack_variants() {
        assert_eq!(MessageKind::from_discriminator(Some("ack")), MessageKind::Ack);
        assert_eq!(MessageKind::from_discriminator(Some("cn")), MessageKind::Ack);
    }

    #[test]
    fn unknown_type_is_preserved() {
        let kind = MessageKind::from_discriminator(Some("depthUpdate"));
        assert_eq!(kind, MessageKind::Other("depthUpdate".to_string()));
        assert!(!kind.is_data());
    }

    #[test]
    fn missing_type_is_untyped() {
        assert_eq!(MessageKind::from_discriminator(None), MessageKind::Untyped);
    }

    #[test]
    fn from_payload_reads_discriminator_and_symbol() {
        let payload = serde_json::json!({
            "type": "symbolUpdate",
            "symbol": "NSE:SBIN-EQ",
            "ltp": 812.4
        });

        let msg = DecodedMessage::from_payload(payload);
        assert_eq!(msg.kind, MessageKind::SymbolUpdate);
        assert_eq!(msg.symbol(), Some("NSE:SBIN-EQ"));
    }

    #[test]
    fn from_payload_without_symbol() {
        let msg = DecodedMessage::from_payload(serde_json::json!({"type": "ack"}));
        assert_eq!(msg.kind, MessageKind::Ack);
        assert!(msg.symbol().is_none());
    }
}
