//! Inbound Frame Codec
//!
//! Decodes inbound JSON text frames into [`DecodedMessage`] values. Decode
//! failures are local and non-fatal to the connection: the error carries
//! the raw payload so callers can surface it unchanged for diagnostics
//! instead of dropping it.

use crate::domain::message::DecodedMessage;

/// Codec errors. The raw frame text is preserved for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Frame was not valid JSON.
    #[error("invalid JSON frame: {source}")]
    Json {
        /// Underlying parse error.
        source: serde_json::Error,
        /// The raw frame text, unchanged.
        raw: String,
    },

    /// Frame parsed but was not a JSON object.
    #[error("expected JSON object, got {kind}")]
    NotAnObject {
        /// JSON kind that was actually received.
        kind: &'static str,
        /// The raw frame text, unchanged.
        raw: String,
    },
}

impl DecodeError {
    /// The raw frame text that failed to decode.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Json { raw, .. } | Self::NotAnObject { raw, .. } => raw,
        }
    }
}

/// JSON codec for inbound feed frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame into a structured message.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] carrying the raw frame when the text is not
    /// a JSON object.
    pub fn decode(&self, text: &str) -> Result<DecodedMessage, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|source| DecodeError::Json {
                source,
                raw: text.to_string(),
            })?;

        if !value.is_object() {
            return Err(DecodeError::NotAnObject {
                kind: json_kind(&value),
                raw: text.to_string(),
            });
        }

        Ok(DecodedMessage::from_payload(value))
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
